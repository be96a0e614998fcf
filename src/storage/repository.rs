//!   Core repository handle.
//!
//!  This is the central component of the storage layer. It owns the paths of
//!  one control directory and ties the object store, staging index, HEAD and
//!  commit journal together into the operations the CLI exposes.
//!
//! Layout under the control directory:
//!
//! ```text
//! .rocket/
//!   objects/<hash>     raw file contents and commit records
//!   HEAD               newest commit id, empty before the first commit
//!   index              staged entries as a JSON array
//!   tmp/               scratch space for atomic writes
//!   lock               present while add or commit runs
//!   COMMIT_PENDING     present while a commit is being applied
//! ```

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::RepositoryConfig;
use crate::storage::commit::{self, Commit, CommitBuilder, History, LogEntry};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::index::StagingIndex;
use crate::storage::journal::{CommitJournal, RecoveryReport};
use crate::storage::lock::RepoLock;
use crate::storage::object::ObjectStore;
use crate::storage::refs::HeadRef;
use crate::storage::types::{ObjectId, StagingEntry};

const OBJECTS_DIR: &str = "objects";
const TMP_DIR: &str = "tmp";
const HEAD_FILE: &str = "HEAD";
const INDEX_FILE: &str = "index";
const LOCK_FILE: &str = "lock";
const JOURNAL_FILE: &str = "COMMIT_PENDING";

/// The main repository handle.
///
/// Clone this to share it, it uses Arc internally. Mutating operations are
/// serialized inside the process and guarded by a lock file across processes.
#[derive(Clone)]
pub struct Repository {
    inner: Arc<RepositoryInner>,
}

struct RepositoryInner {
    config: RepositoryConfig,
    control_dir: PathBuf,
    store: ObjectStore,
    index: StagingIndex,
    head: HeadRef,
    journal: CommitJournal,
    lock_path: PathBuf,
    writer: Mutex<()>,
}

/// What [`Repository::initialize`] found on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// `HEAD` or `index` was missing and has been created
    Created,
    /// both files were already there and were left alone
    AlreadyInitialized,
}

/// Counts describing a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryStats {
    pub head: Option<ObjectId>,
    pub commit_count: usize,
    pub object_count: usize,
    pub staged_count: usize,
}

impl Repository {
    /// Initialize a repository, or reuse the one already there.
    ///
    /// Existing `HEAD` and `index` files are never overwritten.
    pub fn init(config: RepositoryConfig) -> StorageResult<Self> {
        Self::initialize(config).map(|(repo, _)| repo)
    }

    /// Like [`Repository::init`], also reporting whether anything was created.
    pub fn initialize(config: RepositoryConfig) -> StorageResult<(Self, InitOutcome)> {
        let control_dir = config.control_dir();
        std::fs::create_dir_all(control_dir.join(OBJECTS_DIR))?;
        std::fs::create_dir_all(control_dir.join(TMP_DIR))?;

        let created_head = create_if_absent(&control_dir.join(HEAD_FILE), b"")?;
        let created_index = create_if_absent(&control_dir.join(INDEX_FILE), b"[]")?;

        let outcome = if created_head || created_index {
            info!(path = %control_dir.display(), "initialized repository");
            InitOutcome::Created
        } else {
            info!(path = %control_dir.display(), "repository already initialized");
            InitOutcome::AlreadyInitialized
        };

        Ok((Self::load(config)?, outcome))
    }

    /// Open an existing repository.
    pub fn open(config: RepositoryConfig) -> StorageResult<Self> {
        let control_dir = config.control_dir();
        if !control_dir.join(OBJECTS_DIR).is_dir() {
            return Err(StorageError::NotInitialized(control_dir));
        }
        Self::load(config)
    }

    /// Open or initialize a repository, honoring `create_if_missing`.
    pub fn open_with_config(config: RepositoryConfig) -> StorageResult<Self> {
        if config.create_if_missing {
            Self::init(config)
        } else {
            Self::open(config)
        }
    }

    fn load(config: RepositoryConfig) -> StorageResult<Self> {
        let control_dir = config.control_dir();
        let tmp_dir = control_dir.join(TMP_DIR);
        let sync = config.sync;

        let repo = Self {
            inner: Arc::new(RepositoryInner {
                store: ObjectStore::new(control_dir.join(OBJECTS_DIR), &tmp_dir, sync),
                index: StagingIndex::new(control_dir.join(INDEX_FILE), &tmp_dir, sync),
                head: HeadRef::new(control_dir.join(HEAD_FILE), &tmp_dir, sync),
                journal: CommitJournal::new(control_dir.join(JOURNAL_FILE), &tmp_dir, sync),
                lock_path: control_dir.join(LOCK_FILE),
                writer: Mutex::new(()),
                control_dir,
                config,
            }),
        };

        repo.recover()?;
        Ok(repo)
    }

    /// Finish or drop an interrupted commit.
    ///
    /// Runs on every open but only takes the lock when there is something
    /// to repair, so a clean read-only repository still opens. Skipped while
    /// another writer holds the lock. Writers repair leftovers before they
    /// start, so a skipped recovery is picked up by the next `add` or `commit`.
    pub fn recover(&self) -> StorageResult<RecoveryReport> {
        if !self.inner.journal.needs_recovery()? {
            return Ok(RecoveryReport::default());
        }

        let _guard = self.inner.writer.lock();
        let _lock = match RepoLock::acquire(&self.inner.lock_path) {
            Ok(lock) => lock,
            Err(StorageError::Locked(_)) => {
                debug!("writer active, skipping recovery");
                return Ok(RecoveryReport::default());
            }
            Err(StorageError::Io(e)) if e.kind() == ErrorKind::PermissionDenied => {
                warn!("repository is read-only, skipping recovery");
                return Ok(RecoveryReport::default());
            }
            Err(e) => return Err(e),
        };

        self.finish_pending()
    }

    /// Repair leftovers of an interrupted write. Caller holds the lock.
    fn finish_pending(&self) -> StorageResult<RecoveryReport> {
        let inner = &self.inner;
        if !inner.journal.needs_recovery()? {
            return Ok(RecoveryReport::default());
        }
        inner.journal.recover(&inner.store, &inner.head, &inner.index)
    }

    /// Get the working tree path.
    pub fn path(&self) -> &Path {
        &self.inner.config.root
    }

    /// Get the control directory path.
    pub fn control_dir(&self) -> &Path {
        &self.inner.control_dir
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.inner.config
    }

    /// Get the object store.
    pub fn objects(&self) -> &ObjectStore {
        &self.inner.store
    }

    // ==================== Staging ====================

    /// Stage the file at `path`.
    ///
    /// The file is read before anything is written, so an unreadable file
    /// leaves the repository untouched. Returns the content hash.
    pub fn add(&self, path: impl AsRef<Path>) -> StorageResult<ObjectId> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| StorageError::SourceFileUnreadable {
            path: path.to_path_buf(),
            source,
        })?;

        self.add_bytes(path.to_string_lossy(), &bytes)
    }

    /// Stage `bytes` under the entry name `path`.
    pub fn add_bytes(&self, path: impl Into<String>, bytes: &[u8]) -> StorageResult<ObjectId> {
        let _guard = self.inner.writer.lock();
        let _lock = RepoLock::acquire(&self.inner.lock_path)?;
        self.finish_pending()?;

        let hash = self.inner.store.put(bytes)?;
        let entry = StagingEntry::new(path, hash.clone());
        info!(path = %entry.path, hash = %hash, "added file");

        if self.inner.config.dedup_staged_paths {
            self.inner.index.upsert(entry)?;
        } else {
            self.inner.index.append(entry)?;
        }
        Ok(hash)
    }

    /// Get the staged entries.
    pub fn status(&self) -> StorageResult<Vec<StagingEntry>> {
        self.inner.index.load()
    }

    // ==================== History ====================

    /// Record the staging index as a new commit on top of HEAD.
    ///
    /// Returns the new commit ID, which is also the new HEAD.
    pub fn commit(&self, message: impl Into<String>) -> StorageResult<ObjectId> {
        let _guard = self.inner.writer.lock();
        let _lock = RepoLock::acquire(&self.inner.lock_path)?;
        self.finish_pending()?;
        let inner = &self.inner;

        let staged = inner.index.load()?;
        let parent = inner.head.read()?;
        let file_count = staged.len();

        let id = CommitBuilder::new(&inner.store)
            .files(staged)
            .parent(parent)
            .message(message)
            .commit()?;

        inner.journal.apply(&inner.head, &inner.index, &id)?;
        info!(commit = %id, files = file_count, "created commit");
        Ok(id)
    }

    /// Get the current HEAD commit, `None` before the first commit.
    pub fn head(&self) -> StorageResult<Option<ObjectId>> {
        self.inner.head.read()
    }

    /// Get a commit record.
    pub fn read_commit(&self, id: &ObjectId) -> StorageResult<Commit> {
        commit::read_commit(&self.inner.store, id)
    }

    /// Get any object's raw bytes.
    pub fn read_object(&self, id: &ObjectId) -> StorageResult<Vec<u8>> {
        self.inner.store.get(id)
    }

    /// Walk history from HEAD, newest first.
    ///
    /// Each call starts over from the current HEAD.
    pub fn log(&self) -> StorageResult<History<'_>> {
        Ok(History::new(&self.inner.store, self.head()?))
    }

    /// Collect up to `limit` log entries (all of them with `None`).
    pub fn history(&self, limit: Option<usize>) -> StorageResult<Vec<LogEntry>> {
        self.log()?
            .take(limit.unwrap_or(usize::MAX))
            .collect()
    }

    /// Compute repository statistics.
    pub fn stats(&self) -> StorageResult<RepositoryStats> {
        Ok(RepositoryStats {
            head: self.head()?,
            commit_count: self.history(None)?.len(),
            object_count: self.inner.store.count()?,
            staged_count: self.status()?.len(),
        })
    }
}

/// Write `contents` to `path` unless the file exists. Returns whether it wrote.
fn create_if_absent(path: &Path, contents: &[u8]) -> StorageResult<bool> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            file.write_all(contents)?;
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(StorageError::Io(e)),
    }
}
