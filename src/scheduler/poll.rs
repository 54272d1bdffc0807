//! Fixed-interval driver for the fetch cycle
//!
//! One background task ticks every period and runs a cycle inline, so two
//! cycles never overlap. Ticks missed while a cycle overran are skipped.
//! Shutdown goes through a `watch` channel, which makes `stop` idempotent.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::error::{SchedulerError, SchedulerResult};
use crate::pipeline::FetchOrchestrator;

/// Lifecycle of a [`PollScheduler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Running,
    /// Terminal
    Stopped,
}

enum Slot {
    Idle,
    Running {
        task: JoinHandle<()>,
        shutdown: watch::Sender<bool>,
    },
    Stopped,
}

/// Runs [`FetchOrchestrator::run_cycle`] on a fixed interval
pub struct PollScheduler {
    orchestrator: Arc<FetchOrchestrator>,
    slot: Mutex<Slot>,
}

impl PollScheduler {
    pub fn new(orchestrator: Arc<FetchOrchestrator>) -> Self {
        Self {
            orchestrator,
            slot: Mutex::new(Slot::Idle),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current lifecycle state
    pub fn state(&self) -> PollState {
        match *self.slot() {
            Slot::Idle => PollState::Idle,
            Slot::Running { .. } => PollState::Running,
            Slot::Stopped => PollState::Stopped,
        }
    }

    /// Start polling every `interval_minutes`
    ///
    /// A non-positive interval is rejected; no default is substituted. So is
    /// one too large for the clock to schedule. The first cycle runs one
    /// interval after this call.
    pub fn start(&self, interval_minutes: i64) -> SchedulerResult<()> {
        if interval_minutes <= 0 {
            tracing::error!(interval_minutes, "Poll interval must be positive");
            return Err(SchedulerError::invalid_interval(interval_minutes));
        }

        let period = Duration::from_secs((interval_minutes as u64).saturating_mul(60));
        self.start_with_period(period)
    }

    /// Start polling with an explicit period
    pub fn start_with_period(&self, period: Duration) -> SchedulerResult<()> {
        if period.is_zero() {
            tracing::error!("Poll period must be positive");
            return Err(SchedulerError::invalid_interval(0));
        }

        let Some(first_tick) = Instant::now().checked_add(period) else {
            let minutes = i64::try_from(period.as_secs() / 60).unwrap_or(i64::MAX);
            tracing::error!(minutes, "Poll period is out of range");
            return Err(SchedulerError::invalid_interval(minutes));
        };

        let mut slot = self.slot();
        match *slot {
            Slot::Idle => {}
            Slot::Running { .. } => return Err(SchedulerError::AlreadyStarted),
            Slot::Stopped => return Err(SchedulerError::Stopped),
        }

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let orchestrator = Arc::clone(&self.orchestrator);

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(first_tick, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = orchestrator.run_cycle().await;
                        tracing::debug!(
                            updated = report.updated(),
                            failed = report.failed(),
                            "Scheduled fetch cycle finished"
                        );
                    }
                    _ = shutdown_rx.changed() => {
                        tracing::info!("Poll scheduler shutting down");
                        break;
                    }
                }
            }
        });

        *slot = Slot::Running { task, shutdown };
        tracing::info!(period_secs = period.as_secs_f64(), "Poll scheduler started");
        Ok(())
    }

    /// Stop polling and wait for the loop to exit
    ///
    /// A cycle already in progress runs to completion first. Calling this
    /// more than once, or before `start`, is harmless.
    pub async fn stop(&self) {
        let previous = std::mem::replace(&mut *self.slot(), Slot::Stopped);

        if let Slot::Running { task, shutdown } = previous {
            let _ = shutdown.send(true);
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Poll task ended abnormally");
            }
            tracing::info!("Poll scheduler stopped");
        }
    }
}
