//! Per-source feed snapshots
//!
//! Each source's most recent feed is kept as one pretty-printed JSON file,
//! `{dir}/{source}.json`. The snapshot is the baseline that the next fetch is
//! diffed against, and the document the notification scheduler delivers.
//!
//! # Example
//!
//! ```no_run
//! use feedrelay::models::Feed;
//! use feedrelay::storage::SnapshotStore;
//!
//! # fn example() -> Result<(), feedrelay::storage::StorageError> {
//! let store = SnapshotStore::new("./rss_output")?;
//! store.save("hn", &Feed::default())?;
//! let feed = store.load("hn");
//! assert!(feed.items.is_empty());
//! # Ok(())
//! # }
//! ```

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::{StorageError, StorageResult};
use crate::models::Feed;

const SNAPSHOT_EXT: &str = "json";

/// Reads and writes the last known feed of every source
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    /// Directory holding `{source}.json` files
    dir: PathBuf,
}

impl SnapshotStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn new(dir: impl AsRef<Path>) -> StorageResult<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;

        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Snapshot directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path for a source's snapshot
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{SNAPSHOT_EXT}"))
    }

    /// Load a snapshot, treating a missing or unreadable file as an empty feed
    ///
    /// A malformed file is logged and then ignored so the next successful
    /// fetch replaces it.
    pub fn load(&self, name: &str) -> Feed {
        match self.try_load(name) {
            Ok(Some(feed)) => feed,
            Ok(None) => Feed::default(),
            Err(e) => {
                tracing::warn!(source = name, error = %e, "Ignoring unreadable snapshot");
                Feed::default()
            }
        }
    }

    /// Load a snapshot, distinguishing "missing" from "unreadable"
    pub fn try_load(&self, name: &str) -> StorageResult<Option<Feed>> {
        let path = self.path_for(name);

        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io(&path, e)),
        };

        let feed = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| StorageError::malformed(&path, e))?;

        tracing::debug!(path = %path.display(), "Snapshot loaded");
        Ok(Some(feed))
    }

    /// Persist a snapshot
    ///
    /// The feed is written to a temporary sibling and renamed over the final
    /// path, so concurrent readers see either the old or the new document.
    pub fn save(&self, name: &str, feed: &Feed) -> StorageResult<PathBuf> {
        let path = self.path_for(name);
        let temp_path = self.dir.join(format!("{name}.{SNAPSHOT_EXT}.tmp"));

        let file = File::create(&temp_path).map_err(|e| StorageError::io(&temp_path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, feed)
            .map_err(|e| StorageError::malformed(&temp_path, e))?;
        writer
            .flush()
            .map_err(|e| StorageError::io(&temp_path, e))?;
        drop(writer);

        fs::rename(&temp_path, &path).map_err(|e| StorageError::io(&path, e))?;

        tracing::debug!(path = %path.display(), items = feed.items.len(), "Snapshot saved");
        Ok(path)
    }

    /// Check if a snapshot exists
    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).exists()
    }

    /// Names of all stored snapshots, sorted
    pub fn list(&self) -> StorageResult<Vec<String>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| StorageError::io(&self.dir, e))?;

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(SNAPSHOT_EXT))
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(String::from))
            .collect();

        names.sort();
        Ok(names)
    }
}
