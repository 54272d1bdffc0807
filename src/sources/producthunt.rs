//! ProductHunt daily digest scraper
//!
//! The digest page lists products as numbered `<h2><a href=..>N. Name</a></h2>`
//! headings, each followed by labelled paragraphs:
//!
//! ```text
//! <h2><a href="https://www.producthunt.com/posts/foo">1. Foo</a></h2>
//! <p><strong>标语</strong>：One line pitch<br>
//! <strong>介绍</strong>：Longer introduction<br>
//! <strong>产品网站</strong>: <a href="https://foo.app">立即访问</a><br></p>
//! ```
//!
//! Every heading opens a block that runs until the next heading; the
//! labelled fields are looked up inside that block only, so a product with
//! a missing field does not shift the fields of its neighbours.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::{Arc, OnceLock};

use super::{PageFetcher, Source, SourceResult};
use crate::models::{Feed, Item};
use crate::utils::clean_text;
use crate::utils::error::ParseError;

const FEED_TITLE: &str = "ProductHunt Daily";
const FEED_DESCRIPTION: &str = "Daily ProductHunt Updates";
const WEBSITE_LABEL: &str = "【产品网站】";

/// Source for the dated ProductHunt digest pages
pub struct ProductHuntSource {
    fetcher: Arc<PageFetcher>,
}

impl ProductHuntSource {
    pub fn new(fetcher: Arc<PageFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Source for ProductHuntSource {
    fn kind(&self) -> &str {
        "producthunt"
    }

    async fn fetch(&self, url: &str) -> SourceResult<Feed> {
        let html = self.fetcher.fetch_text(url).await?;
        Ok(parse_digest(&html, Utc::now())?)
    }
}

struct Patterns {
    heading: Regex,
    tagline: Regex,
    intro: Regex,
    website: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();

    PATTERNS.get_or_init(|| Patterns {
        heading: Regex::new(
            r#"<h2[^>]*>\s*<a[^>]*href="([^"]+)"[^>]*>\s*(?:\d+\.\s*)?([^<]+?)\s*</a>\s*</h2>"#,
        )
        .expect("Invalid regex pattern"),
        tagline: Regex::new(r"<strong>标语</strong>\s*[：:]\s*([^<]+)")
            .expect("Invalid regex pattern"),
        intro: Regex::new(r"<strong>介绍</strong>\s*[：:]\s*([^<]+)")
            .expect("Invalid regex pattern"),
        website: Regex::new(r#"<strong>产品网站</strong>\s*[：:]\s*<a[^>]*href="([^"]+)""#)
            .expect("Invalid regex pattern"),
    })
}

/// Extract the digest's products
///
/// Every item is stamped with `now`, as is the feed itself. A page without
/// any product heading is an error so that an empty or redesigned page does
/// not replace a good snapshot.
pub fn parse_digest(html: &str, now: DateTime<Utc>) -> Result<Feed, ParseError> {
    let p = patterns();

    let headings: Vec<_> = p.heading.captures_iter(html).collect();
    if headings.is_empty() {
        return Err(ParseError::NoItemsFound);
    }

    let mut feed = Feed::new(FEED_TITLE, FEED_DESCRIPTION, now);

    for (i, caps) in headings.iter().enumerate() {
        let (Some(whole), Some(link), Some(title)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        let end = headings
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(html.len(), |m| m.start());
        let block = &html[whole.end()..end];

        let field = |re: &Regex| {
            re.captures(block)
                .and_then(|c| c.get(1))
                .map(|m| clean_text(m.as_str()))
                .unwrap_or_default()
        };

        let mut description = field(&p.intro);
        let website = field(&p.website);
        if !website.is_empty() {
            description = format!("{description}\n\n{WEBSITE_LABEL}{website}");
        }

        feed.items.push(Item {
            title: clean_text(title.as_str()),
            link: clean_text(link.as_str()),
            published: now,
            summary: field(&p.tagline),
            description,
            author: None,
        });
    }

    Ok(feed)
}
