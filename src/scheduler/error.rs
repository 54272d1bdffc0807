//! Error types for the scheduler module

use std::fmt;

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Scheduler-specific errors
#[derive(Debug)]
pub enum SchedulerError {
    /// Poll interval must be a positive number of minutes
    InvalidInterval {
        minutes: i64,
    },

    /// A sink's cron expression could not be parsed
    InvalidCron {
        sink: String,
        expression: String,
        reason: String,
    },

    /// Scheduler was already started once
    AlreadyStarted,

    /// Scheduler was stopped and cannot be restarted
    Stopped,

    /// Underlying job runner failed
    Driver {
        reason: String,
    },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInterval { minutes } => {
                write!(f, "Invalid poll interval '{}'. Must be > 0 minutes", minutes)
            }
            Self::InvalidCron {
                sink,
                expression,
                reason,
            } => {
                write!(
                    f,
                    "Invalid cron expression '{}' for sink '{}': {}",
                    expression, sink, reason
                )
            }
            Self::AlreadyStarted => write!(f, "Scheduler already started"),
            Self::Stopped => write!(f, "Scheduler has been stopped"),
            Self::Driver { reason } => write!(f, "Job scheduler error: {}", reason),
        }
    }
}

impl std::error::Error for SchedulerError {}

impl From<tokio_cron_scheduler::JobSchedulerError> for SchedulerError {
    fn from(err: tokio_cron_scheduler::JobSchedulerError) -> Self {
        Self::Driver {
            reason: err.to_string(),
        }
    }
}

impl SchedulerError {
    /// Create an invalid interval error
    pub fn invalid_interval(minutes: i64) -> Self {
        Self::InvalidInterval { minutes }
    }

    /// Create an invalid cron error
    pub fn invalid_cron(
        sink: impl Into<String>,
        expression: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidCron {
            sink: sink.into(),
            expression: expression.into(),
            reason: reason.into(),
        }
    }

    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Driver { .. })
    }
}
