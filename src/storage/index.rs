//! Staging index.
//!
//! The index is a JSON array of `{path, hash}` entries in the order they
//! were staged. It is rewritten in full on every change, through an atomic
//! rename so a crash never leaves half an array on disk.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::fs::atomic_write;
use crate::storage::types::StagingEntry;

/// Handle on the `index` file.
#[derive(Debug, Clone)]
pub struct StagingIndex {
    path: PathBuf,
    tmp_dir: PathBuf,
    sync: bool,
}

impl StagingIndex {
    pub fn new(path: impl Into<PathBuf>, tmp_dir: impl Into<PathBuf>, sync: bool) -> Self {
        Self {
            path: path.into(),
            tmp_dir: tmp_dir.into(),
            sync,
        }
    }

    /// Read the staged entries.
    ///
    /// A missing or blank index file reads as empty.
    pub fn load(&self) -> StorageResult<Vec<StagingEntry>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::Io(e)),
        };

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&raw).map_err(|e| StorageError::CorruptIndex {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// Stage one more entry.
    pub fn append(&self, entry: StagingEntry) -> StorageResult<()> {
        let mut entries = self.load()?;
        debug!(path = %entry.path, hash = %entry.hash, "staging entry");
        entries.push(entry);
        self.replace(&entries)
    }

    /// Stage an entry, dropping any earlier entry for the same path.
    pub fn upsert(&self, entry: StagingEntry) -> StorageResult<()> {
        let mut entries = self.load()?;
        entries.retain(|e| e.path != entry.path);
        debug!(path = %entry.path, hash = %entry.hash, "staging entry (replacing)");
        entries.push(entry);
        self.replace(&entries)
    }

    /// Empty the index.
    pub fn clear(&self) -> StorageResult<()> {
        self.replace(&[])
    }

    /// Persist exactly `entries`.
    pub fn replace(&self, entries: &[StagingEntry]) -> StorageResult<()> {
        let bytes = serde_json::to_vec(entries)?;
        atomic_write(&self.tmp_dir, &self.path, &bytes, self.sync)
    }

    /// get the index file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}
