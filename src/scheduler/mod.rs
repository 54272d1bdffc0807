//! Timed drivers
//!
//! Two independent schedulers run side by side:
//!
//! - [`PollScheduler`] runs the fetch cycle every N minutes
//! - [`NotificationScheduler`] delivers each sink's snapshot on its own cron
//!
//! Both are started once and stopped once; `stop` is idempotent.

pub mod error;
pub mod notify;
pub mod poll;

pub use error::{SchedulerError, SchedulerResult};
pub use notify::{normalize_cron, DeliveryOutcome, NotificationScheduler};
pub use poll::{PollScheduler, PollState};
