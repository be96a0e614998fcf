//! Content-addressed object storage.
//!
//! Each object lives in `objects/<hash>` as its raw bytes. The hash is the
//! digest of those bytes, so writing the same content twice lands on the
//! same file and the second write is skipped. Objects are never rewritten
//! or deleted.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::fs::atomic_write;
use crate::storage::hash::digest;
use crate::storage::types::ObjectId;

/// Handle on the `objects/` directory.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    dir: PathBuf,
    tmp_dir: PathBuf,
    sync: bool,
}

impl ObjectStore {
    /// create a store rooted at `dir`; the directory must already exist
    pub fn new(dir: impl Into<PathBuf>, tmp_dir: impl Into<PathBuf>, sync: bool) -> Self {
        Self {
            dir: dir.into(),
            tmp_dir: tmp_dir.into(),
            sync,
        }
    }

    /// Store `bytes` and return their id.
    pub fn put(&self, bytes: &[u8]) -> StorageResult<ObjectId> {
        let id = digest(bytes);
        let path = self.object_path(&id);

        if path.exists() {
            debug!(id = %id, "object already stored");
            return Ok(id);
        }

        atomic_write(&self.tmp_dir, &path, bytes, self.sync)?;
        debug!(id = %id, size = bytes.len(), "stored object");
        Ok(id)
    }

    /// Read an object's bytes.
    pub fn get(&self, id: &ObjectId) -> StorageResult<Vec<u8>> {
        match std::fs::read(self.object_path(id)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(id.clone())),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    /// check whether an object exists
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.object_path(id).is_file()
    }

    /// number of stored objects
    pub fn count(&self) -> StorageResult<usize> {
        let mut count = 0;
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            if entry.file_type()?.is_file()
                && name.to_str().is_some_and(|n| ObjectId::from_hex(n).is_ok())
            {
                count += 1;
            }
        }
        Ok(count)
    }

    /// get the directory objects are stored in
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn object_path(&self, id: &ObjectId) -> PathBuf {
        self.dir.join(id.as_str())
    }
}
