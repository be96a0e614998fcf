//! Commit journal and crash recovery.
//!
//! A commit touches three files: the new commit object, `HEAD`, and
//! `index`. The object is written first and is harmless on its own. Before
//! `HEAD` moves, the new head is recorded in `COMMIT_PENDING`; the journal is
//! removed only once `HEAD` and `index` both reflect the commit. On open, a
//! leftover journal is rolled forward, so after recovery the repository is
//! always in either the old or the new state.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::fs::{atomic_write, clean_tmp_dir};
use crate::storage::index::StagingIndex;
use crate::storage::object::ObjectStore;
use crate::storage::refs::HeadRef;
use crate::storage::types::ObjectId;

/// contents of `COMMIT_PENDING`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PendingCommit {
    head: ObjectId,
}

/// What [`CommitJournal::recover`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// commit that was rolled forward onto HEAD
    pub rolled_forward: Option<ObjectId>,
    /// a journal was found but could not be applied and was dropped
    pub discarded: bool,
    /// interrupted temp files removed from `tmp/`
    pub temp_files_removed: usize,
}

impl RecoveryReport {
    pub fn is_clean(&self) -> bool {
        self.rolled_forward.is_none() && !self.discarded && self.temp_files_removed == 0
    }
}

/// Handle on `COMMIT_PENDING`.
#[derive(Debug, Clone)]
pub struct CommitJournal {
    path: PathBuf,
    tmp_dir: PathBuf,
    sync: bool,
}

impl CommitJournal {
    pub fn new(path: impl Into<PathBuf>, tmp_dir: impl Into<PathBuf>, sync: bool) -> Self {
        Self {
            path: path.into(),
            tmp_dir: tmp_dir.into(),
            sync,
        }
    }

    /// Move HEAD to `new_head` and clear the index as one durable step.
    ///
    /// `new_head` must already be in the object store.
    pub fn apply(&self, head: &HeadRef, index: &StagingIndex, new_head: &ObjectId) -> StorageResult<()> {
        let pending = PendingCommit {
            head: new_head.clone(),
        };
        atomic_write(&self.tmp_dir, &self.path, &serde_json::to_vec(&pending)?, self.sync)?;

        Self::finish(head, index, new_head)?;
        self.remove()
    }

    /// Bring a repository back to a consistent state after a crash.
    pub fn recover(
        &self,
        store: &ObjectStore,
        head: &HeadRef,
        index: &StagingIndex,
    ) -> StorageResult<RecoveryReport> {
        let mut report = RecoveryReport {
            temp_files_removed: clean_tmp_dir(&self.tmp_dir)?,
            ..Default::default()
        };
        if report.temp_files_removed > 0 {
            warn!(count = report.temp_files_removed, "removed interrupted writes");
        }

        let Some(pending) = self.read()? else {
            return Ok(report);
        };

        match pending {
            Some(pending) if store.contains(&pending.head) => {
                info!(head = %pending.head, "rolling forward interrupted commit");
                Self::finish(head, index, &pending.head)?;
                report.rolled_forward = Some(pending.head);
            }
            _ => {
                warn!(path = %self.path.display(), "discarding unusable commit journal");
                report.discarded = true;
            }
        }

        self.remove()?;
        Ok(report)
    }

    /// check whether a commit was interrupted
    pub fn is_pending(&self) -> bool {
        self.path.exists()
    }

    /// check whether [`CommitJournal::recover`] has anything to do
    ///
    /// Only looks, so it works on a repository the caller cannot write.
    pub fn needs_recovery(&self) -> StorageResult<bool> {
        if self.is_pending() {
            return Ok(true);
        }
        match std::fs::read_dir(&self.tmp_dir) {
            Ok(mut entries) => Ok(entries.next().is_some()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn finish(head: &HeadRef, index: &StagingIndex, new_head: &ObjectId) -> StorageResult<()> {
        head.write(new_head)?;
        index.clear()
    }

    /// `None` when there is no journal, `Some(None)` when it is unreadable
    fn read(&self) -> StorageResult<Option<Option<PendingCommit>>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes).ok())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn remove(&self) -> StorageResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::hash::digest;
    use crate::storage::types::StagingEntry;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        store: ObjectStore,
        head: HeadRef,
        index: StagingIndex,
        journal: CommitJournal,
    }

    fn setup() -> Fixture {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let tmp = root.join("tmp");
        std::fs::create_dir_all(root.join("objects")).unwrap();

        Fixture {
            store: ObjectStore::new(root.join("objects"), &tmp, false),
            head: HeadRef::new(root.join("HEAD"), &tmp, false),
            index: StagingIndex::new(root.join("index"), &tmp, false),
            journal: CommitJournal::new(root.join("COMMIT_PENDING"), &tmp, false),
            dir,
        }
    }

    #[test]
    fn test_apply() {
        let f = setup();
        let blob = f.store.put(b"hello").unwrap();
        f.index.append(StagingEntry::new("a.txt", blob)).unwrap();
        let commit = f.store.put(b"commit record").unwrap();

        f.journal.apply(&f.head, &f.index, &commit).unwrap();

        assert_eq!(f.head.read().unwrap(), Some(commit));
        assert!(f.index.load().unwrap().is_empty());
        assert!(!f.journal.is_pending());
    }

    #[test]
    fn test_needs_recovery() {
        let f = setup();
        assert!(!f.journal.needs_recovery().unwrap());

        std::fs::create_dir_all(f.dir.path().join("tmp")).unwrap();
        assert!(!f.journal.needs_recovery().unwrap());

        std::fs::write(f.dir.path().join("tmp").join(".tmpX1y2"), b"partial").unwrap();
        assert!(f.journal.needs_recovery().unwrap());
        f.journal.recover(&f.store, &f.head, &f.index).unwrap();
        assert!(!f.journal.needs_recovery().unwrap());

        std::fs::write(f.journal.path(), "{}").unwrap();
        assert!(f.journal.needs_recovery().unwrap());
    }

    #[test]
    fn test_recover_clean_repository() {
        let f = setup();
        let report = f.journal.recover(&f.store, &f.head, &f.index).unwrap();
        assert!(report.is_clean());
    }

    #[test]
    fn test_recover_rolls_forward() {
        let f = setup();
        let blob = f.store.put(b"hello").unwrap();
        f.index.append(StagingEntry::new("a.txt", blob)).unwrap();
        let commit = f.store.put(b"commit record").unwrap();

        // crash after the journal was written, before HEAD moved
        let pending = format!(r#"{{"head":"{}"}}"#, commit);
        std::fs::write(f.journal.path(), pending).unwrap();

        let report = f.journal.recover(&f.store, &f.head, &f.index).unwrap();
        assert_eq!(report.rolled_forward, Some(commit.clone()));
        assert_eq!(f.head.read().unwrap(), Some(commit));
        assert!(f.index.load().unwrap().is_empty());
        assert!(!f.journal.is_pending());
    }

    #[test]
    fn test_recover_discards_dangling_journal() {
        let f = setup();
        let blob = f.store.put(b"hello").unwrap();
        f.index.append(StagingEntry::new("a.txt", blob)).unwrap();

        let missing = digest(b"never stored");
        std::fs::write(f.journal.path(), format!(r#"{{"head":"{}"}}"#, missing)).unwrap();

        let report = f.journal.recover(&f.store, &f.head, &f.index).unwrap();
        assert!(report.discarded);
        assert_eq!(f.head.read().unwrap(), None);
        assert_eq!(f.index.load().unwrap().len(), 1);
        assert!(!f.journal.is_pending());
    }

    #[test]
    fn test_recover_discards_garbage_journal() {
        let f = setup();
        std::fs::write(f.journal.path(), "{not json").unwrap();

        let report = f.journal.recover(&f.store, &f.head, &f.index).unwrap();
        assert!(report.discarded);
        assert!(report.rolled_forward.is_none());
    }
}
