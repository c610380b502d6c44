//! File-backed persistence for cache subtrees
//!
//! Each completed query chain writes its id-to-object mapping to
//! `<root_dir>/dat/<segments joined by "_">.json`, overwritten whole on every
//! save. A later run finding the file skips the network entirely for that
//! cache path.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::warn;

use super::path::CachePath;

/// Reads and writes persisted cache subtrees under one root directory
#[derive(Debug, Clone)]
pub struct DiskCache {
    root_dir: PathBuf,
}

impl DiskCache {
    /// Creates a disk cache rooted at `root_dir`; files land in
    /// `<root_dir>/dat/`
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Returns the backing-file path for a cache path
    pub fn file_path(&self, path: &CachePath) -> PathBuf {
        path.file_path(&self.root_dir)
    }

    /// Ensures the data directory exists
    fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(self.root_dir.join("dat"))
    }

    /// Loads the persisted subtree for `path`.
    ///
    /// Returns `None` if the file does not exist. A file that exists but
    /// fails to parse is logged and also treated as absent, so the caller
    /// falls through to a network fetch either way.
    pub fn load(&self, path: &CachePath) -> Option<Value> {
        let file_path = self.file_path(path);
        let content = fs::read_to_string(&file_path).ok()?;
        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(file = %file_path.display(), %err, "unparseable cache file, refetching");
                None
            }
        }
    }

    /// Overwrites the backing file for `path` with the given subtree.
    ///
    /// The write replaces the whole file; last save wins. Parent directories
    /// are created as needed.
    pub fn save(&self, path: &CachePath, subtree: &Map<String, Value>) -> io::Result<()> {
        self.ensure_dir()?;
        let json = serde_json::to_string_pretty(subtree)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        fs::write(self.file_path(path), json)
    }

    /// The root directory this cache writes under
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }
}
