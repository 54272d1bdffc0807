//! Source adapters
//!
//! A [`Source`] turns a URL into a [`Feed`]. Every concrete source kind
//! (syndication feeds, templated digest pages, CSS-selector scrapes) shares
//! the same [`http::PageFetcher`] for transport and differs only in how the
//! fetched document is parsed.
//!
//! A source may also react to the incremental items computed after each
//! fetch through [`Source::complete`]; [`Notifying`] uses that hook to
//! forward new items straight to a sink.

pub mod html;
pub mod http;
pub mod producthunt;
pub mod rss;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::models::Feed;
use crate::sinks::{Sink, SinkError};
use crate::utils::error::{FetchError, ParseError};

pub use html::{SelectorRules, SelectorSource};
pub use http::{FetchOptions, PageFetcher};
pub use producthunt::ProductHuntSource;
pub use rss::RssSource;

/// Result type for source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors raised by source adapters
#[derive(Error, Debug)]
pub enum SourceError {
    /// Transport failure
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Document could not be turned into a feed
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// The URL to fetch could not be built
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// The completion hook failed to deliver
    #[error("Completion hook failed: {0}")]
    Completion(#[from] SinkError),
}

impl SourceError {
    /// Whether the next cycle could plausibly succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch(_) | Self::Completion(_) => true,
            Self::Parse(_) | Self::InvalidTarget(_) => false,
        }
    }
}

/// A pluggable producer of feeds
#[async_trait]
pub trait Source: Send + Sync {
    /// Short identifier of the source kind, used in logs
    fn kind(&self) -> &str;

    /// Fetch the current feed from `url`
    async fn fetch(&self, url: &str) -> SourceResult<Feed>;

    /// Called with the new items after a changed feed has been persisted
    ///
    /// Not called when the increment is empty or the snapshot write failed.
    async fn complete(&self, incremental: &Feed) -> SourceResult<()> {
        let _ = incremental;
        Ok(())
    }
}

/// Source wrapper whose completion hook delivers the increment to a sink
pub struct Notifying {
    inner: Arc<dyn Source>,
    sink: Arc<dyn Sink>,
}

impl Notifying {
    pub fn new(inner: Arc<dyn Source>, sink: Arc<dyn Sink>) -> Self {
        Self { inner, sink }
    }
}

#[async_trait]
impl Source for Notifying {
    fn kind(&self) -> &str {
        self.inner.kind()
    }

    async fn fetch(&self, url: &str) -> SourceResult<Feed> {
        self.inner.fetch(url).await
    }

    async fn complete(&self, incremental: &Feed) -> SourceResult<()> {
        self.inner.complete(incremental).await?;
        self.sink.send(incremental).await?;
        tracing::info!(
            sink = self.sink.name(),
            items = incremental.items.len(),
            "Delivered new items"
        );
        Ok(())
    }
}
