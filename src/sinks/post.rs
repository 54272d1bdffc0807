//! Rich-text "post" webhook sink
//!
//! Renders a feed into the post message format understood by chat bot
//! webhooks:
//!
//! ```json
//! {
//!   "msg_type": "post",
//!   "content": {
//!     "post": {
//!       "zh_cn": {
//!         "title": "Feed title",
//!         "content": [
//!           [{"tag": "text", "text": "\n"}, {"tag": "a", "text": "Item", "href": "https://..."}]
//!         ]
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! One row is emitted per item, capped at `max_items`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Formatter, Sink, SinkResult, WebhookClient};
use crate::models::{Feed, Item};

const SEPARATOR: &str = "--------------------------------\n";
const DEFAULT_LOCALE: &str = "zh_cn";

/// A single inline element of a post row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "lowercase")]
pub enum Element {
    Text { text: String },
    A { text: String, href: String },
}

impl Element {
    fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    fn link(text: impl Into<String>, href: impl Into<String>) -> Self {
        Self::A {
            text: text.into(),
            href: href.into(),
        }
    }
}

/// Localised post body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostBody {
    pub title: String,
    pub content: Vec<Vec<Element>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostContent {
    pub post: BTreeMap<String, PostBody>,
}

/// Complete post message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostMessage {
    pub msg_type: String,
    pub content: PostContent,
}

/// How each item is laid out in a row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostLayout {
    /// Link text `"{title}: {summary}"`, then the description
    Digest,
    /// Link text is the title, then description and publication time
    #[default]
    Entries,
}

/// Sink that delivers feeds as rich-text posts
pub struct PostSink {
    name: String,
    client: WebhookClient,
    layout: PostLayout,
    max_items: usize,
    locale: String,
    formatter: Option<Formatter>,
}

impl PostSink {
    pub fn new(name: impl Into<String>, client: WebhookClient) -> Self {
        Self {
            name: name.into(),
            client,
            layout: PostLayout::default(),
            max_items: 10,
            locale: DEFAULT_LOCALE.to_string(),
            formatter: None,
        }
    }

    pub fn with_layout(mut self, layout: PostLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Render the message for a feed
    pub fn render(&self, feed: &Feed) -> PostMessage {
        let mut feed = feed.truncated(self.max_items);
        if let Some(formatter) = &self.formatter {
            formatter(&mut feed);
        }

        let content = feed.items.iter().map(|item| self.row(item)).collect();

        let mut post = BTreeMap::new();
        post.insert(
            self.locale.clone(),
            PostBody {
                title: feed.title.clone(),
                content,
            },
        );

        PostMessage {
            msg_type: "post".to_string(),
            content: PostContent { post },
        }
    }

    fn row(&self, item: &Item) -> Vec<Element> {
        match self.layout {
            PostLayout::Digest => vec![
                Element::text("\n"),
                Element::link(format!("{}: {}", item.title, item.summary), &item.link),
                Element::text("\n\n"),
                Element::text(format!("{}\n\n", item.description)),
                Element::text(SEPARATOR),
            ],
            PostLayout::Entries => vec![
                Element::text("\n"),
                Element::link(&item.title, &item.link),
                Element::text("\n\n"),
                Element::text(format!("{}\n\n", item.description)),
                Element::text(format!(
                    "{}{}\n\n",
                    self.published_label(),
                    item.published.format("%Y-%m-%d %H:%M:%S")
                )),
                Element::text(SEPARATOR),
            ],
        }
    }

    fn published_label(&self) -> &'static str {
        if self.locale.starts_with("zh") {
            "发布时间："
        } else {
            "Published: "
        }
    }
}

#[async_trait]
impl Sink for PostSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, feed: &Feed) -> SinkResult<()> {
        let message = self.render(feed);
        let payload = serde_json::to_value(&message)?;

        self.client.post_json(&payload).await?;

        tracing::info!(
            sink = %self.name,
            title = %feed.title,
            items = feed.items.len().min(self.max_items),
            "Post delivered"
        );
        Ok(())
    }

    fn set_formatter(&mut self, formatter: Formatter) {
        self.formatter = Some(formatter);
    }
}
