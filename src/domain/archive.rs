//! Archive and staging models
//!
//! An [`ArchiveHandle`] is produced by the fetcher for every download. The
//! [`ArchiveRecord`] is what survives in the store after a successful import,
//! and a [`StagedFileSet`] hands extracted table files to the importer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A downloaded archive on local disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveHandle {
    /// Location of the complete archive
    pub path: PathBuf,

    /// Size in bytes
    pub byte_len: u64,

    /// Hex-encoded SHA-256, when computed during download
    pub sha256: Option<String>,
}

impl ArchiveHandle {
    /// Create a handle without a digest
    pub fn new(path: impl Into<PathBuf>, byte_len: u64) -> Self {
        Self {
            path: path.into(),
            byte_len,
            sha256: None,
        }
    }

    /// Attach a precomputed digest
    pub fn with_sha256(mut self, digest: impl Into<String>) -> Self {
        self.sha256 = Some(digest.into());
        self
    }
}

/// What is known about the archive behind the last committed import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRecord {
    /// Digest of the imported archive
    pub sha256: Option<String>,

    /// Size of the imported archive
    pub byte_len: Option<u64>,

    /// When the import committed
    pub imported_at: Option<DateTime<Utc>>,
}

impl ArchiveRecord {
    /// True when nothing usable for comparison was stored
    pub fn is_empty(&self) -> bool {
        self.sha256.is_none() && self.byte_len.is_none()
    }
}

/// Extracted table files keyed by table name
///
/// # Examples
///
/// ```
/// use gtfs_sync::domain::StagedFileSet;
///
/// let mut staged = StagedFileSet::new("/tmp/gtfs_data");
/// staged.insert("stops", "/tmp/gtfs_data/stops.txt");
/// assert!(staged.contains("stops"));
/// assert_eq!(staged.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StagedFileSet {
    dir: PathBuf,
    files: BTreeMap<String, PathBuf>,
}

impl StagedFileSet {
    /// Create an empty set rooted at a staging directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: BTreeMap::new(),
        }
    }

    /// Register a staged file for a table, replacing any earlier entry
    pub fn insert(&mut self, table: impl Into<String>, path: impl Into<PathBuf>) {
        self.files.insert(table.into(), path.into());
    }

    /// Path of the staged file for a table
    pub fn get(&self, table: &str) -> Option<&Path> {
        self.files.get(table).map(PathBuf::as_path)
    }

    pub fn contains(&self, table: &str) -> bool {
        self.files.contains_key(table)
    }

    /// Staged table names in sorted order
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Staging directory the files live in
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Remove the staged files, keeping the directory for the next run
    pub fn discard(self) -> std::io::Result<()> {
        for path in self.files.values() {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}
