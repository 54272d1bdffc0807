//! Prometheus metrics for the fetch pipeline and notifier
//!
//! This module provides metrics tracking for:
//! - Fetch cycles: duration, per-source fetch failures, new items, hook failures
//! - Snapshot persistence failures
//! - Notifications: deliveries and failures per sink
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops. The process
//! has no HTTP surface, so metrics are exported by writing the text format
//! to a file (for a node-exporter textfile collector) with
//! [`write_textfile`].

use prometheus::{
    register_counter_vec, register_histogram, CounterVec, Encoder, Histogram, TextEncoder,
};
use std::path::Path;
use std::sync::OnceLock;

/// Container for all pipeline metrics
struct PipelineMetrics {
    cycle_duration: Histogram,
    fetch_failures: CounterVec,
    new_items: CounterVec,
    hook_failures: CounterVec,
    snapshot_failures: CounterVec,
    notifications_sent: CounterVec,
    notifications_failed: CounterVec,
}

/// Global storage for pipeline metrics; `None` when registration failed
static PIPELINE_METRICS: OnceLock<Option<PipelineMetrics>> = OnceLock::new();

fn metrics() -> Option<&'static PipelineMetrics> {
    PIPELINE_METRICS.get().and_then(Option::as_ref)
}

/// Initialize all Prometheus metrics
///
/// Safe to call more than once, including concurrently; only the first call
/// registers anything. If registration fails, the error is returned once and
/// every record function stays a no-op.
///
/// # Example
///
/// ```ignore
/// if let Err(e) = feedrelay::metrics::init_metrics() {
///     eprintln!("Warning: Metrics initialization failed: {}", e);
/// }
/// ```
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    let mut failure = None;

    PIPELINE_METRICS.get_or_init(|| match register() {
        Ok(metrics) => {
            tracing::info!("Prometheus metrics initialized successfully");
            Some(metrics)
        }
        Err(e) => {
            failure = Some(e.to_string());
            None
        }
    });

    match failure {
        Some(reason) => Err(reason.into()),
        None => Ok(()),
    }
}

fn register() -> Result<PipelineMetrics, prometheus::Error> {
    Ok(PipelineMetrics {
        cycle_duration: register_histogram!(
            "feedrelay_cycle_duration_seconds",
            "Time spent running one fetch cycle over all sources",
            vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]
        )?,
        fetch_failures: register_counter_vec!(
            "feedrelay_fetch_failures_total",
            "Total failed fetches per source",
            &["source"]
        )?,
        new_items: register_counter_vec!(
            "feedrelay_new_items_total",
            "Total new items detected per source",
            &["source"]
        )?,
        hook_failures: register_counter_vec!(
            "feedrelay_hook_failures_total",
            "Total failed completion hooks per source",
            &["source"]
        )?,
        snapshot_failures: register_counter_vec!(
            "feedrelay_snapshot_write_failures_total",
            "Total failed snapshot writes per source",
            &["source"]
        )?,
        notifications_sent: register_counter_vec!(
            "feedrelay_notifications_sent_total",
            "Total successful deliveries per sink",
            &["sink"]
        )?,
        notifications_failed: register_counter_vec!(
            "feedrelay_notifications_failed_total",
            "Total failed deliveries per sink",
            &["sink"]
        )?,
    })
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    metrics().is_some()
}

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Write all metrics to `path` (atomically, via a temporary sibling)
pub fn write_textfile(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let text = encode_metrics()?;
    let temp = path.with_extension("prom.tmp");
    std::fs::write(&temp, text)?;
    std::fs::rename(&temp, path)?;
    Ok(())
}

/// Record a completed fetch cycle
pub fn record_cycle(duration_secs: f64) {
    if let Some(m) = metrics() {
        m.cycle_duration.observe(duration_secs);
    }
}

/// Record a failed fetch
pub fn record_fetch_failure(source: &str) {
    if let Some(m) = metrics() {
        m.fetch_failures.with_label_values(&[source]).inc();
    }
}

/// Record new items found for a source
pub fn record_new_items(source: &str, count: usize) {
    if let Some(m) = metrics() {
        m.new_items
            .with_label_values(&[source])
            .inc_by(count as f64);
    }
}

/// Record a failed completion hook
pub fn record_hook_failure(source: &str) {
    if let Some(m) = metrics() {
        m.hook_failures.with_label_values(&[source]).inc();
    }
}

/// Record a failed snapshot write
pub fn record_snapshot_failure(source: &str) {
    if let Some(m) = metrics() {
        m.snapshot_failures.with_label_values(&[source]).inc();
    }
}

/// Record the result of a sink delivery
pub fn record_notification(sink: &str, success: bool) {
    let Some(m) = metrics() else {
        return;
    };

    if success {
        m.notifications_sent.with_label_values(&[sink]).inc();
    } else {
        m.notifications_failed.with_label_values(&[sink]).inc();
    }
}
