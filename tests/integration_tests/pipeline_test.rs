//! Fetch cycle scenarios
//!
//! Runs the orchestrator against scripted sources and a temporary snapshot
//! directory, checking what gets persisted and when the completion hook fires.

use std::sync::Arc;
use tempfile::TempDir;

use crate::common::{at, feed_with, RecordingSink, ScriptedSource};
use feedrelay::pipeline::{FeedTarget, FetchOrchestrator, HookOutcome, SourceOutcome};
use feedrelay::sources::Notifying;
use feedrelay::storage::SnapshotStore;

fn store(dir: &TempDir) -> Arc<SnapshotStore> {
    Arc::new(SnapshotStore::new(dir.path()).unwrap())
}

/// First fetch without a snapshot persists everything and hands every item
/// to the hook
#[tokio::test]
async fn test_seed_run_emits_all_items() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let source = ScriptedSource::always(feed_with(at(0), &["A", "B", "C"]));

    let mut orchestrator = FetchOrchestrator::new(Arc::clone(&store));
    orchestrator.add_source("daily", source.clone(), FeedTarget::fixed("https://x/daily"));

    let report = orchestrator.run_cycle().await;

    assert_eq!(
        report.get("daily"),
        Some(&SourceOutcome::Updated {
            new_items: 3,
            persisted: true,
            hook: HookOutcome::Completed,
        })
    );
    assert_eq!(store.load("daily").items.len(), 3);
    assert_eq!(source.completion_count(), 1);

    let increment = &source.completions.lock().unwrap()[0];
    let titles: Vec<_> = increment.items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["A", "B", "C"]);
    assert_eq!(source.fetched_urls.lock().unwrap()[0], "https://x/daily");
}

/// Same `last_updated` as the snapshot: no overwrite, no hook, even if the
/// items differ
#[tokio::test]
async fn test_unchanged_timestamp_skips_everything() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    store.save("daily", &feed_with(at(0), &["A", "B"])).unwrap();

    let source = ScriptedSource::always(feed_with(at(0), &["X", "Y"]));
    let mut orchestrator = FetchOrchestrator::new(Arc::clone(&store));
    orchestrator.add_source("daily", source.clone(), FeedTarget::fixed("https://x/daily"));

    let report = orchestrator.run_cycle().await;

    assert_eq!(report.get("daily"), Some(&SourceOutcome::Unchanged));
    let kept: Vec<_> = store
        .load("daily")
        .items
        .into_iter()
        .map(|i| i.title)
        .collect();
    assert_eq!(kept, vec!["A", "B"]);
    assert_eq!(source.completion_count(), 0);
}

/// Newer feed with items prepended: only the prefix is new
#[tokio::test]
async fn test_prepended_items_are_the_increment() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    store.save("blog", &feed_with(at(0), &["A", "B", "C"])).unwrap();

    let source = ScriptedSource::always(feed_with(at(5), &["X", "Y", "A", "B", "C"]));
    let mut orchestrator = FetchOrchestrator::new(Arc::clone(&store));
    orchestrator.add_source("blog", source.clone(), FeedTarget::fixed("https://x/blog"));

    let report = orchestrator.run_cycle().await;
    assert_eq!(report.new_items(), 2);

    let increment = &source.completions.lock().unwrap()[0];
    let titles: Vec<_> = increment.items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["X", "Y"]);
    assert_eq!(store.load("blog").items.len(), 5);
}

/// Updated timestamp without new items: saved, hook not called
#[tokio::test]
async fn test_update_without_new_items_skips_hook() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    store.save("blog", &feed_with(at(0), &["A", "B"])).unwrap();

    let source = ScriptedSource::always(feed_with(at(10), &["A", "B"]));
    let mut orchestrator = FetchOrchestrator::new(Arc::clone(&store));
    orchestrator.add_source("blog", source.clone(), FeedTarget::fixed("https://x/blog"));

    let report = orchestrator.run_cycle().await;

    assert_eq!(
        report.get("blog"),
        Some(&SourceOutcome::Updated {
            new_items: 0,
            persisted: true,
            hook: HookOutcome::Skipped,
        })
    );
    assert_eq!(store.load("blog").last_updated, at(10));
    assert_eq!(source.completion_count(), 0);
}

/// Two cycles with no upstream change leave the file byte-identical and the
/// second one calls no hook
#[tokio::test]
async fn test_second_run_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let source = ScriptedSource::always(feed_with(at(0), &["A", "B", "C"]));

    let mut orchestrator = FetchOrchestrator::new(Arc::clone(&store));
    orchestrator.add_source("daily", source.clone(), FeedTarget::fixed("https://x/daily"));

    orchestrator.run_cycle().await;
    let first = std::fs::read(store.path_for("daily")).unwrap();

    let report = orchestrator.run_cycle().await;
    let second = std::fs::read(store.path_for("daily")).unwrap();

    assert_eq!(first, second);
    assert_eq!(report.get("daily"), Some(&SourceOutcome::Unchanged));
    assert_eq!(source.completion_count(), 1);
    assert_eq!(source.fetch_count(), 2);
}

/// Dated targets are resolved before fetching
#[tokio::test]
async fn test_dated_target_resolved_at_fetch_time() {
    let dir = TempDir::new().unwrap();
    let source = ScriptedSource::always(feed_with(at(0), &["A"]));

    let mut orchestrator = FetchOrchestrator::new(store(&dir));
    orchestrator.add_source(
        "producthunt",
        source.clone(),
        FeedTarget::dated("https://x/daily-{{date}}/", "%Y-%m-%d"),
    );
    orchestrator.run_cycle().await;

    let expected = format!(
        "https://x/daily-{}/",
        chrono::Local::now().format("%Y-%m-%d")
    );
    assert_eq!(source.fetched_urls.lock().unwrap()[0], expected);
}

/// A notifying source pushes exactly the new items to its sink
#[tokio::test]
async fn test_notifying_source_delivers_increment() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    store.save("blog", &feed_with(at(0), &["A"])).unwrap();

    let inner = ScriptedSource::always(feed_with(at(1), &["B", "A"]));
    let sink = RecordingSink::new("blog");

    let mut orchestrator = FetchOrchestrator::new(Arc::clone(&store));
    orchestrator.add_source(
        "blog",
        Arc::new(Notifying::new(inner.clone(), sink.clone())),
        FeedTarget::fixed("https://x/blog"),
    );

    orchestrator.run_cycle().await;

    assert_eq!(sink.count(), 1);
    let delivered = &sink.delivered.lock().unwrap()[0];
    assert_eq!(delivered.items.len(), 1);
    assert_eq!(delivered.items[0].title, "B");
    assert_eq!(inner.completion_count(), 1);
}

/// Re-registering a name keeps only the latest source
#[tokio::test]
async fn test_last_registration_wins() {
    let dir = TempDir::new().unwrap();
    let first = ScriptedSource::always(feed_with(at(0), &["old"]));
    let second = ScriptedSource::always(feed_with(at(0), &["new"]));

    let mut orchestrator = FetchOrchestrator::new(store(&dir));
    orchestrator.add_source("dup", first.clone(), FeedTarget::fixed("https://x/1"));
    orchestrator.add_source("dup", second.clone(), FeedTarget::fixed("https://x/2"));
    assert_eq!(orchestrator.len(), 1);

    orchestrator.run_cycle().await;
    assert_eq!(first.fetch_count(), 0);
    assert_eq!(second.fetch_count(), 1);
}
