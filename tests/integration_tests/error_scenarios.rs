//! Failure isolation
//!
//! A failing source or sink must never take the others down with it, and a
//! failed fetch must never clobber a good snapshot.

use std::sync::Arc;
use tempfile::TempDir;

use crate::common::{at, feed_with, RecordingSink, ScriptedSource};
use feedrelay::pipeline::{FeedTarget, FetchOrchestrator, HookOutcome, SourceOutcome};
use feedrelay::scheduler::{DeliveryOutcome, NotificationScheduler};
use feedrelay::sources::Notifying;
use feedrelay::storage::SnapshotStore;

/// One of three sources fails; the other two are persisted in the same cycle
#[tokio::test]
async fn test_one_failing_source_does_not_block_others() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SnapshotStore::new(dir.path()).unwrap());

    let mut orchestrator = FetchOrchestrator::new(Arc::clone(&store));
    orchestrator.add_source(
        "alpha",
        ScriptedSource::always(feed_with(at(0), &["a1"])),
        FeedTarget::fixed("https://x/a"),
    );
    orchestrator.add_source("broken", ScriptedSource::failing(), FeedTarget::fixed("https://x/b"));
    orchestrator.add_source(
        "gamma",
        ScriptedSource::always(feed_with(at(0), &["g1", "g2"])),
        FeedTarget::fixed("https://x/g"),
    );

    let report = orchestrator.run_cycle().await;

    assert_eq!(report.failed(), 1);
    assert_eq!(report.updated(), 2);
    assert!(matches!(
        report.get("broken"),
        Some(SourceOutcome::FetchFailed(_))
    ));
    assert!(store.exists("alpha"));
    assert!(store.exists("gamma"));
    assert!(!store.exists("broken"));
}

/// A failed fetch keeps the previous snapshot untouched
#[tokio::test]
async fn test_failed_fetch_keeps_snapshot() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SnapshotStore::new(dir.path()).unwrap());
    let snapshot = feed_with(at(0), &["A", "B"]);
    store.save("blog", &snapshot).unwrap();

    let mut orchestrator = FetchOrchestrator::new(Arc::clone(&store));
    orchestrator.add_source("blog", ScriptedSource::failing(), FeedTarget::fixed("https://x/blog"));
    orchestrator.run_cycle().await;

    assert_eq!(store.load("blog"), snapshot);
}

/// A hook failure is reported but the snapshot is still written
#[tokio::test]
async fn test_hook_failure_keeps_new_snapshot() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SnapshotStore::new(dir.path()).unwrap());

    let mut orchestrator = FetchOrchestrator::new(Arc::clone(&store));
    orchestrator.add_source(
        "blog",
        Arc::new(Notifying::new(
            ScriptedSource::always(feed_with(at(0), &["A"])),
            RecordingSink::failing("blog"),
        )),
        FeedTarget::fixed("https://x/blog"),
    );

    let report = orchestrator.run_cycle().await;

    assert!(matches!(
        report.get("blog"),
        Some(SourceOutcome::Updated {
            new_items: 1,
            persisted: true,
            hook: HookOutcome::Failed(_),
        })
    ));
    assert_eq!(store.load("blog").items.len(), 1);
}

/// A snapshot that cannot be written suppresses the hook, so the same items
/// are not pushed again on every cycle
#[tokio::test]
async fn test_failed_save_skips_hook() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SnapshotStore::new(dir.path()).unwrap());
    store.save("blog", &feed_with(at(0), &["A"])).unwrap();
    std::fs::create_dir(dir.path().join("blog.json.tmp")).unwrap();

    let source = ScriptedSource::always(feed_with(at(5), &["B", "A"]));
    let sink = RecordingSink::new("blog");
    let mut orchestrator = FetchOrchestrator::new(Arc::clone(&store));
    orchestrator.add_source(
        "blog",
        Arc::new(Notifying::new(source.clone(), sink.clone())),
        FeedTarget::fixed("https://x/blog"),
    );

    for _ in 0..2 {
        let report = orchestrator.run_cycle().await;
        assert_eq!(
            report.get("blog"),
            Some(&SourceOutcome::Updated {
                new_items: 1,
                persisted: false,
                hook: HookOutcome::Skipped,
            })
        );
    }

    assert_eq!(source.completion_count(), 0);
    assert_eq!(sink.count(), 0);
    assert_eq!(store.load("blog").items.len(), 1);

    // once the store is writable again the increment goes out exactly once
    std::fs::remove_dir(dir.path().join("blog.json.tmp")).unwrap();
    let report = orchestrator.run_cycle().await;
    assert_eq!(
        report.get("blog"),
        Some(&SourceOutcome::Updated {
            new_items: 1,
            persisted: true,
            hook: HookOutcome::Completed,
        })
    );
    orchestrator.run_cycle().await;

    assert_eq!(sink.count(), 1);
    assert_eq!(sink.delivered.lock().unwrap()[0].items[0].title, "B");
}

/// A malformed snapshot counts as empty: the next fetch is a seed run
#[tokio::test]
async fn test_malformed_snapshot_treated_as_empty() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SnapshotStore::new(dir.path()).unwrap());
    std::fs::write(store.path_for("blog"), "{ not json").unwrap();

    let source = ScriptedSource::always(feed_with(at(0), &["A", "B"]));
    let mut orchestrator = FetchOrchestrator::new(Arc::clone(&store));
    orchestrator.add_source("blog", source.clone(), FeedTarget::fixed("https://x/blog"));

    let report = orchestrator.run_cycle().await;

    assert_eq!(report.new_items(), 2);
    assert_eq!(store.load("blog").items.len(), 2);
}

/// One failing sink does not stop delivery to the rest
#[tokio::test]
async fn test_failing_sink_isolated() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SnapshotStore::new(dir.path()).unwrap());
    store.save("a", &feed_with(at(0), &["1"])).unwrap();
    store.save("b", &feed_with(at(0), &["2"])).unwrap();

    let healthy = RecordingSink::new("b");
    let mut notifier = NotificationScheduler::new(Arc::clone(&store));
    notifier.add_sink("a", RecordingSink::failing("a"), "0 0 8 * * *");
    notifier.add_sink("b", healthy.clone(), "0 0 8 * * *");

    let outcomes = notifier.send_all().await;

    assert!(matches!(outcomes["a"], DeliveryOutcome::Failed(_)));
    assert_eq!(outcomes["b"], DeliveryOutcome::Sent(1));
    assert_eq!(healthy.count(), 1);
}
