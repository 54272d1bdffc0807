// Core data structures for feedrelay

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Canonical feed shape shared by every source and sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Feed {
    pub title: String,
    pub description: String,
    pub last_updated: DateTime<Utc>, // source-reported, or fetch time
    pub items: Vec<Item>,            // newest first by convention
}

/// A single feed entry. The title is its identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Item {
    pub title: String,
    pub link: String,
    pub published: DateTime<Utc>,
    pub summary: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl Feed {
    /// Create an empty feed stamped with the given update time
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        last_updated: DateTime<Utc>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            last_updated,
            items: Vec::new(),
        }
    }

    /// True when the feed carries no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Set of item titles, used as identity keys for deduplication
    pub fn titles(&self) -> HashSet<&str> {
        self.items.iter().map(|item| item.title.as_str()).collect()
    }

    /// Same feed with at most `limit` items
    pub fn truncated(&self, limit: usize) -> Self {
        Self {
            items: self.items.iter().take(limit).cloned().collect(),
            ..self.clone()
        }
    }
}

impl Item {
    /// Create an item with title and link; other fields default
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            ..Default::default()
        }
    }

    /// Whether two items refer to the same entry
    pub fn same_entry(&self, other: &Item) -> bool {
        self.title == other.title
    }
}
