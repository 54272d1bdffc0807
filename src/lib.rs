//! feedrelay - incremental feed fetching and webhook delivery
//!
//! Polls a set of sources on an interval, keeps the latest copy of each feed
//! as a JSON snapshot, works out which items are new since the previous
//! snapshot, and delivers feeds to webhook sinks on cron schedules (or as
//! soon as new items show up).
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`] - Feed and item types
//! - [`sources`] - Source adapters (RSS/Atom, digest pages, CSS selectors)
//! - [`sinks`] - Webhook sinks and formatters
//! - [`storage`] - JSON snapshot store
//! - [`pipeline`] - Fetch orchestration and the incremental differ
//! - [`scheduler`] - Poll and notification schedulers
//! - [`config`] - Configuration management and settings
//! - [`app`] - Wiring from configuration to running components
//! - [`metrics`] - Prometheus counters
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use feedrelay::app::App;
//! use feedrelay::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml".as_ref())?;
//!     let app = App::from_config(&config)?;
//!     let report = app.orchestrator.run_cycle().await;
//!     println!("{} sources updated", report.updated());
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod scheduler;
pub mod sinks;
pub mod sources;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::app::App;
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, FeedRelayErrorTrait, Result};
    pub use crate::models::{Feed, Item};
    pub use crate::pipeline::{latest_feed, CycleReport, FeedTarget, FetchOrchestrator};
    pub use crate::scheduler::{NotificationScheduler, PollScheduler};
    pub use crate::sinks::Sink;
    pub use crate::sources::Source;
    pub use crate::storage::SnapshotStore;
}

// Direct re-exports for convenience
pub use models::{Feed, Item};
