//! Feed formatters applied by sinks before rendering

use regex::Regex;
use std::sync::Arc;

use crate::models::Feed;

/// In-place rewrite of a feed copy
pub type Formatter = Arc<dyn Fn(&mut Feed) + Send + Sync>;

/// Pattern used by blog digests that wrap each entry's text in
/// `<h3>` headings followed by a paragraph
pub const BEST_BLOGS_PATTERN: &str = r"</h3>\s*<p[^>]*>([^<]*?)</p>";

/// Formatter that mines an item's summary with a regular expression
///
/// The first capture group of the first match becomes the new summary and
/// that of the second match the new description. Items without a match are
/// left untouched.
pub fn pattern(re: Regex) -> Formatter {
    Arc::new(move |feed: &mut Feed| {
        for item in &mut feed.items {
            let captures: Vec<String> = re
                .captures_iter(&item.summary)
                .take(2)
                .filter_map(|c| c.get(1).map(|m| m.as_str().trim().to_string()))
                .collect();

            if let Some(summary) = captures.first() {
                item.summary = summary.clone();
            }
            if let Some(description) = captures.get(1) {
                item.description = description.clone();
            }
        }
    })
}

/// Formatter for digests following [`BEST_BLOGS_PATTERN`]
pub fn best_blogs() -> Formatter {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let re = RE
        .get_or_init(|| Regex::new(BEST_BLOGS_PATTERN).expect("Invalid regex pattern"))
        .clone();
    pattern(re)
}

/// Look up a built-in formatter by name
pub fn by_name(name: &str) -> Option<Formatter> {
    match name {
        "best_blogs" | "best-blogs" => Some(best_blogs()),
        _ => None,
    }
}
