//! Fetch orchestration
//!
//! [`FetchOrchestrator`] owns the source registry and runs one fetch cycle
//! at a time:
//!
//! ```text
//! resolve URL -> fetch -> load snapshot -> unchanged? stop
//!                                       -> save -> diff -> complete(increment)
//! ```
//!
//! Failures are isolated per source. A source that fails to fetch keeps its
//! previous snapshot, and the other sources in the cycle still run.

pub mod diff;

use chrono::{DateTime, Local, TimeZone};
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Error, FeedRelayErrorTrait};
use crate::metrics;
use crate::models::Feed;
use crate::sources::{Source, SourceError};
use crate::storage::SnapshotStore;

pub use diff::latest_feed;

/// Placeholder replaced by the formatted date in dated targets
pub const DATE_PLACEHOLDER: &str = "{{date}}";

/// Where a source fetches from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedTarget {
    /// A fixed URL
    Static(String),
    /// A URL template whose `{{date}}` is replaced by the current local date
    Dated {
        template: String,
        date_format: String,
    },
}

impl FeedTarget {
    /// Build a fixed target
    pub fn fixed(url: impl Into<String>) -> Self {
        Self::Static(url.into())
    }

    /// Build a dated target, e.g. `("https://x/daily-{{date}}/", "%Y-%m-%d")`
    pub fn dated(template: impl Into<String>, date_format: impl Into<String>) -> Self {
        Self::Dated {
            template: template.into(),
            date_format: date_format.into(),
        }
    }

    /// URL to fetch at `now`
    pub fn resolve<Tz>(&self, now: &DateTime<Tz>) -> Result<String, SourceError>
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        match self {
            Self::Static(url) => Ok(url.clone()),
            Self::Dated {
                template,
                date_format,
            } => {
                let mut date = String::new();
                write!(date, "{}", now.format(date_format)).map_err(|_| {
                    SourceError::InvalidTarget(format!("invalid date format '{date_format}'"))
                })?;
                Ok(template.replace(DATE_PLACEHOLDER, &date))
            }
        }
    }
}

impl fmt::Display for FeedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(url) => f.write_str(url),
            Self::Dated { template, .. } => f.write_str(template),
        }
    }
}

/// What happened to the completion hook of an updated source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    /// Hook not called: no new items, or the snapshot could not be saved
    Skipped,
    Completed,
    Failed(String),
}

/// Result of one source within a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    /// Fetch (or URL resolution) failed; nothing was written
    FetchFailed(String),
    /// Same `last_updated` as the snapshot; nothing was written
    Unchanged,
    /// The feed changed and was processed
    Updated {
        new_items: usize,
        persisted: bool,
        hook: HookOutcome,
    },
}

/// Per-source outcomes of one cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub outcomes: BTreeMap<String, SourceOutcome>,
    pub elapsed: Duration,
}

impl CycleReport {
    /// Outcome for one source
    pub fn get(&self, name: &str) -> Option<&SourceOutcome> {
        self.outcomes.get(name)
    }

    /// Number of sources whose feed changed
    pub fn updated(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, SourceOutcome::Updated { .. }))
            .count()
    }

    /// Number of sources that failed to fetch
    pub fn failed(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, SourceOutcome::FetchFailed(_)))
            .count()
    }

    /// Total new items across sources
    pub fn new_items(&self) -> usize {
        self.outcomes
            .values()
            .map(|o| match o {
                SourceOutcome::Updated { new_items, .. } => *new_items,
                _ => 0,
            })
            .sum()
    }
}

struct Registration {
    source: Arc<dyn Source>,
    target: FeedTarget,
}

/// Registry of sources plus the fetch cycle that drives them
pub struct FetchOrchestrator {
    store: Arc<SnapshotStore>,
    sources: BTreeMap<String, Registration>,
    metrics_textfile: Option<PathBuf>,
}

impl FetchOrchestrator {
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        Self {
            store,
            sources: BTreeMap::new(),
            metrics_textfile: None,
        }
    }

    /// Export metrics to `path` at the end of every cycle
    pub fn with_metrics_textfile(mut self, path: impl Into<PathBuf>) -> Self {
        self.metrics_textfile = Some(path.into());
        self
    }

    /// Register a source under `name`; a later registration replaces an earlier one
    pub fn add_source(
        &mut self,
        name: impl Into<String>,
        source: Arc<dyn Source>,
        target: FeedTarget,
    ) {
        let name = name.into();
        tracing::debug!(source = %name, kind = source.kind(), target = %target, "Source registered");

        if self
            .sources
            .insert(name.clone(), Registration { source, target })
            .is_some()
        {
            tracing::warn!(source = %name, "Source re-registered, previous registration replaced");
        }
    }

    /// Registered source names, sorted
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Snapshot store shared with the notifier
    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Run every registered source once
    pub async fn run_cycle(&self) -> CycleReport {
        let started = Instant::now();
        let mut report = CycleReport::default();

        for (name, registration) in &self.sources {
            let outcome = self.run_source(name, registration).await;
            report.outcomes.insert(name.clone(), outcome);
        }

        report.elapsed = started.elapsed();
        metrics::record_cycle(report.elapsed.as_secs_f64());

        tracing::info!(
            sources = report.outcomes.len(),
            updated = report.updated(),
            failed = report.failed(),
            new_items = report.new_items(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Fetch cycle completed"
        );

        if let Some(path) = &self.metrics_textfile {
            if let Err(e) = metrics::write_textfile(path) {
                tracing::warn!(path = %path.display(), error = %e, "Failed to write metrics textfile");
            }
        }

        report
    }

    async fn run_source(&self, name: &str, registration: &Registration) -> SourceOutcome {
        let source = &registration.source;

        let fetched = match registration.target.resolve(&Local::now()) {
            Ok(url) => {
                tracing::debug!(source = name, kind = source.kind(), url = %url, "Fetching");
                source.fetch(&url).await
            }
            Err(e) => Err(e),
        };

        let fetched: Feed = match fetched {
            Ok(feed) => feed,
            Err(e) => {
                let reason = e.to_string();
                let err = Error::from(e);
                tracing::warn!(
                    source = name,
                    kind = source.kind(),
                    category = err.category().label(),
                    recoverable = err.is_recoverable(),
                    error = %reason,
                    "Fetch failed"
                );
                metrics::record_fetch_failure(name);
                return SourceOutcome::FetchFailed(reason);
            }
        };

        let previous = self.store.load(name);
        if previous.last_updated == fetched.last_updated {
            tracing::debug!(source = name, last_updated = %fetched.last_updated, "Feed unchanged");
            return SourceOutcome::Unchanged;
        }

        let persisted = match self.store.save(name, &fetched) {
            Ok(_) => true,
            Err(e) => {
                let err = Error::from(e);
                tracing::error!(
                    source = name,
                    category = err.category().label(),
                    error = %err,
                    "Failed to save snapshot"
                );
                metrics::record_snapshot_failure(name);
                false
            }
        };

        let incremental = latest_feed(&previous, &fetched);
        let new_items = incremental.items.len();

        if new_items == 0 {
            tracing::info!(source = name, "Feed updated without new items");
            return SourceOutcome::Updated {
                new_items,
                persisted,
                hook: HookOutcome::Skipped,
            };
        }

        tracing::info!(source = name, new_items = new_items, "New items found");
        metrics::record_new_items(name, new_items);

        // the baseline did not move, so the next cycle reports these items again
        if !persisted {
            tracing::warn!(source = name, new_items, "Snapshot not saved, completion hook skipped");
            return SourceOutcome::Updated {
                new_items,
                persisted,
                hook: HookOutcome::Skipped,
            };
        }

        let hook = match source.complete(&incremental).await {
            Ok(()) => HookOutcome::Completed,
            Err(e) => {
                let reason = e.to_string();
                let err = Error::from(e);
                tracing::warn!(
                    source = name,
                    category = err.category().label(),
                    recoverable = err.is_recoverable(),
                    error = %reason,
                    "Completion hook failed"
                );
                metrics::record_hook_failure(name);
                HookOutcome::Failed(reason)
            }
        };

        SourceOutcome::Updated {
            new_items,
            persisted,
            hook,
        }
    }
}
