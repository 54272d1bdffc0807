//! Unified error handling for the feedrelay crate
//!
//! Each layer keeps its own error enum. [`Error`] wraps the ones that cross
//! module boundaries so that the orchestrator, the notifier and the CLI can
//! classify a failure the same way before logging it.
//!
//! # Architecture
//!
//! - [`FeedRelayErrorTrait`] - Common interface implemented by the unified error
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use feedrelay::error::{Error, FeedRelayErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         tracing::warn!(category = ?err.category(), "Will retry: {err}");
//!     } else {
//!         eprintln!("Fatal error: {err}");
//!     }
//! }
//! ```

use thiserror::Error;

pub use crate::scheduler::error::SchedulerError;
pub use crate::sinks::SinkError;
pub use crate::sources::SourceError;
pub use crate::storage::StorageError;
pub use crate::utils::error::{FetchError, ParseError};

/// Common trait for feedrelay error types
pub trait FeedRelayErrorTrait: std::error::Error {
    /// Check if this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, timeout, rate limit)
    Network,
    /// Feed and page parsing errors
    Parsing,
    /// Snapshot and file I/O errors
    Storage,
    /// Configuration and validation errors
    Config,
    /// Scheduler and timing errors
    Scheduler,
    /// Sink delivery errors
    Delivery,
}

impl ErrorCategory {
    /// Short human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Parsing => "parsing",
            Self::Storage => "storage",
            Self::Config => "config",
            Self::Scheduler => "scheduler",
            Self::Delivery => "delivery",
        }
    }
}

/// Unified error type for the feedrelay crate
#[derive(Error, Debug)]
pub enum Error {
    /// Source adapter errors (fetch, parse or completion hook)
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Delivery error: {0}")]
    Sink(#[from] SinkError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
}

impl FeedRelayErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Source(e) => e.is_recoverable(),
            Self::Sink(e) => e.is_retryable(),
            Self::Storage(_) => false,
            Self::Scheduler(e) => e.is_recoverable(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Source(e) => match e {
                SourceError::Fetch(_) => ErrorCategory::Network,
                SourceError::Parse(_) => ErrorCategory::Parsing,
                SourceError::InvalidTarget(_) => ErrorCategory::Config,
                SourceError::Completion(_) => ErrorCategory::Delivery,
            },
            Self::Sink(SinkError::InvalidConfig(_)) => ErrorCategory::Config,
            Self::Sink(_) => ErrorCategory::Delivery,
            Self::Storage(_) => ErrorCategory::Storage,
            Self::Scheduler(SchedulerError::InvalidCron { .. })
            | Self::Scheduler(SchedulerError::InvalidInterval { .. }) => ErrorCategory::Config,
            Self::Scheduler(_) => ErrorCategory::Scheduler,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
