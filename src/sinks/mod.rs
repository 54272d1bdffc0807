//! Notification sinks
//!
//! A [`Sink`] delivers a [`Feed`] to an external channel. Two webhook sinks
//! are provided:
//!
//! - [`post::PostSink`] renders a rich-text "post" message for chat bots
//! - [`webhook::JsonWebhookSink`] posts the feed as plain JSON
//!
//! A [`Formatter`] may rewrite a copy of the feed right before rendering.

pub mod formatter;
pub mod post;
pub mod webhook;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Feed;

pub use formatter::Formatter;
pub use post::{PostLayout, PostSink};
pub use webhook::{JsonWebhookSink, WebhookClient, WebhookConfig};

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Errors that can occur while delivering a feed
#[derive(Debug, Error)]
pub enum SinkError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Endpoint accepted the request but reported an application error
    #[error("Rejected by endpoint (code {code}): {message}")]
    Rejected { code: i64, message: String },

    /// Invalid sink configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SinkError {
    /// Whether resending the same payload could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// A delivery channel for feeds
#[async_trait]
pub trait Sink: Send + Sync {
    /// Sink name, used in logs
    fn name(&self) -> &str;

    /// Deliver the feed
    async fn send(&self, feed: &Feed) -> SinkResult<()>;

    /// Install a formatter applied to a copy of every feed before rendering
    fn set_formatter(&mut self, formatter: Formatter) {
        let _ = formatter;
    }
}
