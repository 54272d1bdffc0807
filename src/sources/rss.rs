//! RSS / Atom / JSON Feed source backed by feed-rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feed_rs::model::Entry;
use std::sync::Arc;

use super::{PageFetcher, Source, SourceResult};
use crate::models::{Feed, Item};
use crate::utils::error::ParseError;

/// Source for standard syndication documents
pub struct RssSource {
    fetcher: Arc<PageFetcher>,
}

impl RssSource {
    pub fn new(fetcher: Arc<PageFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Source for RssSource {
    fn kind(&self) -> &str {
        "rss"
    }

    async fn fetch(&self, url: &str) -> SourceResult<Feed> {
        let raw = self.fetcher.fetch_bytes(url).await?;
        let feed = parse_feed(&raw, Utc::now())?;
        tracing::debug!(url = url, items = feed.items.len(), "Parsed syndication feed");
        Ok(feed)
    }
}

/// Parse a syndication document
///
/// `now` stands in for any timestamp the document does not carry. The
/// channel's update time falls back to its publication time before `now`.
pub fn parse_feed(raw: &[u8], now: DateTime<Utc>) -> Result<Feed, ParseError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(ParseError::EmptyDocument);
    }

    let parsed = feed_rs::parser::parse(raw)?;

    let items = parsed
        .entries
        .iter()
        .map(|entry| item_from_entry(entry, now))
        .collect();

    Ok(Feed {
        title: parsed.title.map(|t| t.content).unwrap_or_default(),
        description: parsed.description.map(|t| t.content).unwrap_or_default(),
        last_updated: parsed.updated.or(parsed.published).unwrap_or(now),
        items,
    })
}

fn item_from_entry(entry: &Entry, now: DateTime<Utc>) -> Item {
    Item {
        title: entry
            .title
            .as_ref()
            .map(|t| t.content.trim().to_string())
            .unwrap_or_default(),
        link: entry
            .links
            .first()
            .map(|link| link.href.clone())
            .unwrap_or_default(),
        published: entry.published.or(entry.updated).unwrap_or(now),
        summary: entry
            .summary
            .as_ref()
            .map(|t| t.content.clone())
            .unwrap_or_default(),
        description: entry
            .content
            .as_ref()
            .and_then(|c| c.body.clone())
            .unwrap_or_default(),
        author: entry
            .authors
            .first()
            .map(|person| person.name.clone())
            .filter(|name| !name.is_empty()),
    }
}
