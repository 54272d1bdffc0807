//! Common test utilities

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use feedrelay::models::{Feed, Item};
use feedrelay::sinks::{Sink, SinkError, SinkResult};
use feedrelay::sources::{FetchOptions, PageFetcher, Source, SourceError, SourceResult};
use feedrelay::utils::error::FetchError;

/// Fixed timestamp, `2024-06-01 08:00 + minutes`
pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap() + chrono::Duration::minutes(minutes)
}

/// Feed with one item per title
pub fn feed_with(last_updated: DateTime<Utc>, titles: &[&str]) -> Feed {
    let mut feed = Feed::new("Test Feed", "fixture", last_updated);
    for title in titles {
        let mut item = Item::new(*title, format!("https://example.com/{title}"));
        item.published = last_updated;
        item.summary = format!("summary of {title}");
        feed.items.push(item);
    }
    feed
}

/// Fetcher tuned for mock servers: short timeout, fast backoff
pub fn fast_fetcher(max_retries: u32) -> PageFetcher {
    PageFetcher::with_options(FetchOptions {
        timeout: Duration::from_secs(5),
        max_retries,
        backoff_base_ms: 10,
        requests_per_second: 100,
        ..FetchOptions::default()
    })
    .unwrap()
}

/// Source that replays scripted fetch results and records hook calls
#[derive(Default)]
pub struct ScriptedSource {
    responses: Mutex<VecDeque<Option<Feed>>>,
    fallback: Mutex<Option<Feed>>,
    pub fetched_urls: Mutex<Vec<String>>,
    pub completions: Mutex<Vec<Feed>>,
}

impl ScriptedSource {
    /// Returns `feed` on every fetch
    pub fn always(feed: Feed) -> Arc<Self> {
        let source = Self::default();
        *source.fallback.lock().unwrap() = Some(feed);
        Arc::new(source)
    }

    /// Fails on every fetch
    pub fn failing() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns the given results in order, then repeats the last one
    pub fn sequence(feeds: Vec<Feed>) -> Arc<Self> {
        let source = Self::default();
        *source.fallback.lock().unwrap() = feeds.last().cloned();
        *source.responses.lock().unwrap() = feeds.into_iter().map(Some).collect();
        Arc::new(source)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched_urls.lock().unwrap().len()
    }

    pub fn completion_count(&self) -> usize {
        self.completions.lock().unwrap().len()
    }
}

#[async_trait]
impl Source for ScriptedSource {
    fn kind(&self) -> &str {
        "scripted"
    }

    async fn fetch(&self, url: &str) -> SourceResult<Feed> {
        self.fetched_urls.lock().unwrap().push(url.to_string());

        let next = self.responses.lock().unwrap().pop_front();
        let feed = match next {
            Some(feed) => feed,
            None => self.fallback.lock().unwrap().clone(),
        };
        feed.ok_or(SourceError::Fetch(FetchError::ServerError(503)))
    }

    async fn complete(&self, incremental: &Feed) -> SourceResult<()> {
        self.completions.lock().unwrap().push(incremental.clone());
        Ok(())
    }
}

/// Sink that records deliveries, optionally failing every call
pub struct RecordingSink {
    name: String,
    fail: bool,
    pub delivered: Mutex<Vec<Feed>>,
}

impl RecordingSink {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fail: false,
            delivered: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fail: true,
            delivered: Mutex::new(Vec::new()),
        })
    }

    pub fn count(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }
}

#[async_trait]
impl Sink for RecordingSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, feed: &Feed) -> SinkResult<()> {
        if self.fail {
            return Err(SinkError::Status {
                status: 500,
                body: "down".to_string(),
            });
        }
        self.delivered.lock().unwrap().push(feed.clone());
        Ok(())
    }
}
