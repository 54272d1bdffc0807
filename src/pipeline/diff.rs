//! Incremental diff between two feed snapshots

use crate::models::Feed;

/// Items of `new` that precede the first already-seen entry
///
/// Metadata (`title`, `description`, `last_updated`) comes from `new`.
/// Items are taken in order until the first one whose title appears in
/// `old`; the scan stops there rather than skipping. When `old` has no items
/// the whole of `new` is returned, so a first run delivers everything.
///
/// If none of the titles match, every item of `new` is emitted. A source
/// that drops all previously seen entries at once therefore re-announces
/// its whole page.
pub fn latest_feed(old: &Feed, new: &Feed) -> Feed {
    if old.items.is_empty() {
        return new.clone();
    }

    let seen = old.titles();
    let items = new
        .items
        .iter()
        .take_while(|item| !seen.contains(item.title.as_str()))
        .cloned()
        .collect();

    Feed {
        title: new.title.clone(),
        description: new.description.clone(),
        last_updated: new.last_updated,
        items,
    }
}
