//! CSS-selector page scraper
//!
//! Turns an arbitrary listing page into a feed using four selectors: one
//! that matches each entry, and title / link / summary selectors evaluated
//! relative to that entry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

use super::{PageFetcher, Source, SourceResult};
use crate::models::{Feed, Item};
use crate::utils::error::ParseError;
use crate::utils::normalize_whitespace;

/// Selector configuration for [`SelectorSource`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorRules {
    /// Matches one element per entry
    pub item: String,

    /// Entry title, relative to the item; defaults to the item's own text
    #[serde(default)]
    pub title: Option<String>,

    /// Element carrying `href`, relative to the item; defaults to the first `a`
    #[serde(default)]
    pub link: Option<String>,

    /// Entry summary, relative to the item
    #[serde(default)]
    pub summary: Option<String>,

    /// Feed title; defaults to the page's `<title>`
    #[serde(default)]
    pub feed_title: Option<String>,
}

struct Compiled {
    item: Selector,
    title: Option<Selector>,
    link: Selector,
    summary: Option<Selector>,
    page_title: Selector,
}

fn compile(selector: &str) -> Result<Selector, ParseError> {
    Selector::parse(selector).map_err(|e| ParseError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

impl Compiled {
    fn new(rules: &SelectorRules) -> Result<Self, ParseError> {
        Ok(Self {
            item: compile(&rules.item)?,
            title: rules.title.as_deref().map(compile).transpose()?,
            link: compile(rules.link.as_deref().unwrap_or("a"))?,
            summary: rules.summary.as_deref().map(compile).transpose()?,
            page_title: compile("title")?,
        })
    }
}

/// Source that scrapes entries out of an HTML page
pub struct SelectorSource {
    fetcher: Arc<PageFetcher>,
    rules: SelectorRules,
    compiled: Compiled,
}

impl SelectorSource {
    /// Build a scraper; fails if any selector does not compile
    pub fn new(fetcher: Arc<PageFetcher>, rules: SelectorRules) -> Result<Self, ParseError> {
        let compiled = Compiled::new(&rules)?;
        Ok(Self {
            fetcher,
            rules,
            compiled,
        })
    }

    /// Selector configuration in use
    pub fn rules(&self) -> &SelectorRules {
        &self.rules
    }

    /// Extract a feed from a fetched page
    pub fn parse_page(
        &self,
        html: &str,
        page_url: &str,
        now: DateTime<Utc>,
    ) -> Result<Feed, ParseError> {
        let document = Html::parse_document(html);
        let base = Url::parse(page_url).ok();
        let c = &self.compiled;

        let title = match &self.rules.feed_title {
            Some(title) => title.clone(),
            None => document
                .select(&c.page_title)
                .next()
                .map(|el| element_text(&el))
                .unwrap_or_default(),
        };

        let mut feed = Feed::new(title, "", now);

        for entry in document.select(&c.item) {
            let title = match &c.title {
                Some(sel) => entry.select(sel).next().map(|el| element_text(&el)),
                None => Some(element_text(&entry)),
            }
            .unwrap_or_default();

            if title.is_empty() {
                continue;
            }

            let href = if entry.value().name() == "a" {
                entry.value().attr("href")
            } else {
                entry
                    .select(&c.link)
                    .next()
                    .and_then(|el| el.value().attr("href"))
            };
            let link = href.map(|h| resolve(base.as_ref(), h)).unwrap_or_default();

            let summary = c
                .summary
                .as_ref()
                .and_then(|sel| entry.select(sel).next())
                .map(|el| element_text(&el))
                .unwrap_or_default();

            feed.items.push(Item {
                title,
                link,
                published: now,
                summary,
                description: String::new(),
                author: None,
            });
        }

        if feed.items.is_empty() {
            return Err(ParseError::NoItemsFound);
        }

        Ok(feed)
    }
}

fn element_text(element: &ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<String>())
}

fn resolve(base: Option<&Url>, href: &str) -> String {
    base.and_then(|b| b.join(href).ok())
        .map(String::from)
        .unwrap_or_else(|| href.to_string())
}

#[async_trait]
impl Source for SelectorSource {
    fn kind(&self) -> &str {
        "html"
    }

    async fn fetch(&self, url: &str) -> SourceResult<Feed> {
        let html = self.fetcher.fetch_text(url).await?;
        Ok(self.parse_page(&html, url, Utc::now())?)
    }
}
