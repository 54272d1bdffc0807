//! Poll and notification scheduler tests
//!
//! These run against the real clock with short periods.

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use crate::common::{at, feed_with, RecordingSink, ScriptedSource};
use feedrelay::pipeline::{FeedTarget, FetchOrchestrator};
use feedrelay::scheduler::{
    DeliveryOutcome, NotificationScheduler, PollScheduler, PollState, SchedulerError,
};
use feedrelay::storage::SnapshotStore;

fn store(dir: &TempDir) -> Arc<SnapshotStore> {
    Arc::new(SnapshotStore::new(dir.path()).unwrap())
}

#[tokio::test]
async fn test_poll_runs_cycles_until_stopped() {
    let dir = TempDir::new().unwrap();
    let source = ScriptedSource::always(feed_with(at(0), &["A"]));

    let mut orchestrator = FetchOrchestrator::new(store(&dir));
    orchestrator.add_source("daily", source.clone(), FeedTarget::fixed("https://x/daily"));
    let poll = PollScheduler::new(Arc::new(orchestrator));

    poll.start_with_period(Duration::from_millis(100)).unwrap();
    tokio::time::sleep(Duration::from_millis(450)).await;
    poll.stop().await;

    let fetched = source.fetch_count();
    assert!(fetched >= 2, "expected at least 2 cycles, got {fetched}");
    assert_eq!(poll.state(), PollState::Stopped);

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(source.fetch_count(), fetched, "no cycles after stop");
}

#[tokio::test]
async fn test_poll_first_cycle_waits_one_period() {
    let dir = TempDir::new().unwrap();
    let source = ScriptedSource::always(feed_with(at(0), &["A"]));

    let mut orchestrator = FetchOrchestrator::new(store(&dir));
    orchestrator.add_source("daily", source.clone(), FeedTarget::fixed("https://x/daily"));
    let poll = PollScheduler::new(Arc::new(orchestrator));

    poll.start_with_period(Duration::from_secs(60)).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(source.fetch_count(), 0);

    poll.stop().await;
    poll.stop().await;
}

#[tokio::test]
async fn test_poll_rejects_non_positive_interval() {
    let dir = TempDir::new().unwrap();
    let poll = PollScheduler::new(Arc::new(FetchOrchestrator::new(store(&dir))));

    let err = poll.start(0).unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidInterval { minutes: 0 }));
    assert_eq!(poll.state(), PollState::Idle);
}

#[tokio::test]
async fn test_invalid_cron_fails_start() {
    let dir = TempDir::new().unwrap();
    let mut notifier = NotificationScheduler::new(store(&dir));
    notifier.add_sink("good", RecordingSink::new("good"), "0 30 8 * * *");
    notifier.add_sink("bad", RecordingSink::new("bad"), "every morning");

    let err = notifier.start().await.unwrap_err();
    match err {
        SchedulerError::InvalidCron {
            sink, expression, ..
        } => {
            assert_eq!(sink, "bad");
            assert_eq!(expression, "every morning");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!notifier.is_running().await);
}

#[tokio::test]
async fn test_send_all_skips_empty_snapshots() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    store.save("full", &feed_with(at(0), &["A", "B"])).unwrap();

    let full = RecordingSink::new("full");
    let empty = RecordingSink::new("empty");

    let mut notifier = NotificationScheduler::new(Arc::clone(&store));
    notifier.add_sink("full", full.clone(), "30 8 * * *");
    notifier.add_sink("empty", empty.clone(), "30 8 * * *");

    let outcomes = notifier.send_all().await;

    assert_eq!(outcomes["full"], DeliveryOutcome::Sent(2));
    assert_eq!(outcomes["empty"], DeliveryOutcome::Skipped);
    assert_eq!(full.count(), 1);
    assert_eq!(empty.count(), 0);

    assert_eq!(
        notifier.send_one("full").await,
        Some(DeliveryOutcome::Sent(2))
    );
    assert_eq!(notifier.send_one("unknown").await, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cron_job_fires_and_stops() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    store.save("ticker", &feed_with(at(0), &["A"])).unwrap();

    let sink = RecordingSink::new("ticker");
    let mut notifier = NotificationScheduler::new(Arc::clone(&store));
    notifier.add_sink("ticker", sink.clone(), "*/1 * * * * *");

    notifier.start().await.unwrap();
    assert!(notifier.is_running().await);
    assert!(matches!(
        notifier.start().await,
        Err(SchedulerError::AlreadyStarted)
    ));

    tokio::time::sleep(Duration::from_millis(2500)).await;
    notifier.stop().await;
    notifier.stop().await;

    assert!(sink.count() >= 1, "cron job never fired");
    assert!(!notifier.is_running().await);
}
