//! Cron-driven delivery of persisted snapshots
//!
//! Each registered sink gets its own cron job. When the job fires, the sink's
//! snapshot (the file named after the sink) is loaded and sent. Cron
//! expressions use the seconds-first syntax of `tokio-cron-scheduler` and are
//! evaluated in UTC; five-field expressions get a leading `0` seconds field.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};

use super::error::{SchedulerError, SchedulerResult};
use crate::error::{Error, FeedRelayErrorTrait};
use crate::metrics;
use crate::sinks::Sink;
use crate::storage::SnapshotStore;

/// Result of delivering one sink's snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Sent with this many items
    Sent(usize),
    /// Snapshot missing or empty
    Skipped,
    Failed(String),
}

struct SinkEntry {
    sink: Arc<dyn Sink>,
    cron: String,
}

/// Registry of sinks and the cron runner that drives them
pub struct NotificationScheduler {
    store: Arc<SnapshotStore>,
    sinks: BTreeMap<String, SinkEntry>,
    runner: Mutex<Option<JobScheduler>>,
}

/// Expand five-field cron expressions to the six-field form
pub fn normalize_cron(expression: &str) -> String {
    let expression = expression.trim();
    if expression.split_whitespace().count() == 5 {
        format!("0 {expression}")
    } else {
        expression.to_string()
    }
}

impl NotificationScheduler {
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        Self {
            store,
            sinks: BTreeMap::new(),
            runner: Mutex::new(None),
        }
    }

    /// Register a sink; a later registration for `name` replaces an earlier one
    pub fn add_sink(&mut self, name: impl Into<String>, sink: Arc<dyn Sink>, cron: impl Into<String>) {
        let name = name.into();
        let cron = cron.into();
        tracing::debug!(sink = %name, cron = %cron, "Sink registered");

        if self
            .sinks
            .insert(name.clone(), SinkEntry { sink, cron })
            .is_some()
        {
            tracing::warn!(sink = %name, "Sink re-registered, previous registration replaced");
        }
    }

    /// Registered sink names, sorted
    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Deliver one sink's snapshot now
    pub async fn send_one(&self, name: &str) -> Option<DeliveryOutcome> {
        let entry = self.sinks.get(name)?;
        Some(deliver(&self.store, name, entry.sink.as_ref()).await)
    }

    /// Deliver every sink's snapshot once, isolating failures
    pub async fn send_all(&self) -> BTreeMap<String, DeliveryOutcome> {
        let mut outcomes = BTreeMap::new();
        for (name, entry) in &self.sinks {
            let outcome = deliver(&self.store, name, entry.sink.as_ref()).await;
            outcomes.insert(name.clone(), outcome);
        }
        outcomes
    }

    /// Parse every cron expression and start the runner
    ///
    /// If any expression is invalid nothing is scheduled and the error names
    /// the offending sink.
    pub async fn start(&self) -> SchedulerResult<()> {
        let mut runner = self.runner.lock().await;
        if runner.is_some() {
            return Err(SchedulerError::AlreadyStarted);
        }

        let mut jobs = Vec::with_capacity(self.sinks.len());
        for (name, entry) in &self.sinks {
            let expression = normalize_cron(&entry.cron);
            let job = self.build_job(name, &entry.sink, &expression).map_err(|e| {
                tracing::error!(sink = %name, cron = %entry.cron, error = %e, "Invalid cron expression");
                SchedulerError::invalid_cron(name, &entry.cron, e.to_string())
            })?;
            jobs.push(job);
        }

        let scheduler = JobScheduler::new().await?;
        for job in jobs {
            scheduler.add(job).await?;
        }
        scheduler.start().await?;

        *runner = Some(scheduler);
        tracing::info!(sinks = self.sinks.len(), "Notification scheduler started");
        Ok(())
    }

    fn build_job(
        &self,
        name: &str,
        sink: &Arc<dyn Sink>,
        expression: &str,
    ) -> Result<Job, tokio_cron_scheduler::JobSchedulerError> {
        let store = Arc::clone(&self.store);
        let sink = Arc::clone(sink);
        let name = name.to_string();

        Job::new_async(expression, move |_id, _scheduler| {
            let store = Arc::clone(&store);
            let sink = Arc::clone(&sink);
            let name = name.clone();
            Box::pin(async move {
                tracing::debug!(sink = %name, "Scheduled delivery firing");
                deliver(&store, &name, sink.as_ref()).await;
            })
        })
    }

    /// Whether the cron runner is active
    pub async fn is_running(&self) -> bool {
        self.runner.lock().await.is_some()
    }

    /// Stop firing jobs; deliveries already in flight are not cancelled
    pub async fn stop(&self) {
        let Some(mut scheduler) = self.runner.lock().await.take() else {
            return;
        };

        if let Err(e) = scheduler.shutdown().await {
            tracing::warn!(error = %e, "Notification scheduler shutdown reported an error");
        }
        tracing::info!("Notification scheduler stopped");
    }
}

async fn deliver(store: &SnapshotStore, name: &str, sink: &dyn Sink) -> DeliveryOutcome {
    let feed = store.load(name);
    if feed.items.is_empty() {
        tracing::debug!(sink = name, "No snapshot items to deliver");
        return DeliveryOutcome::Skipped;
    }

    match sink.send(&feed).await {
        Ok(()) => {
            metrics::record_notification(name, true);
            DeliveryOutcome::Sent(feed.items.len())
        }
        Err(e) => {
            let reason = e.to_string();
            let err = Error::from(e);
            tracing::warn!(
                sink = name,
                category = err.category().label(),
                recoverable = err.is_recoverable(),
                error = %reason,
                "Delivery failed"
            );
            metrics::record_notification(name, false);
            DeliveryOutcome::Failed(reason)
        }
    }
}
