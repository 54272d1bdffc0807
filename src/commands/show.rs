use anyhow::{Context, Result};

use feedrelay::config::Config;
use feedrelay::storage::SnapshotStore;

/// Print a stored snapshot
pub fn show(config: Config, source: String, json: bool) -> Result<()> {
    let store = SnapshotStore::new(&config.fetcher.output_dir)?;

    let Some(feed) = store
        .try_load(&source)
        .with_context(|| format!("Failed to read snapshot for '{source}'"))?
    else {
        let known = store.list()?;
        anyhow::bail!("no snapshot for '{source}' (stored: {})", known.join(", "));
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&feed)?);
        return Ok(());
    }

    println!("{}", feed.title);
    if !feed.description.is_empty() {
        println!("{}", feed.description);
    }
    println!("Last updated: {}", feed.last_updated.to_rfc3339());
    println!("Items: {}\n", feed.items.len());

    for (i, item) in feed.items.iter().enumerate() {
        println!("{:>3}. {}", i + 1, item.title);
        if !item.link.is_empty() {
            println!("     {}", item.link);
        }
        println!("     {}", item.published.format("%Y-%m-%d %H:%M"));
    }
    Ok(())
}
