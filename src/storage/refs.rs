//! The HEAD pointer.
//!
//! `HEAD` holds the hex id of the newest commit, or nothing at all before
//! the first commit. It is the only mutable reference in a repository.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::fs::atomic_write;
use crate::storage::types::ObjectId;

/// Handle on the `HEAD` file.
#[derive(Debug, Clone)]
pub struct HeadRef {
    path: PathBuf,
    tmp_dir: PathBuf,
    sync: bool,
}

impl HeadRef {
    pub fn new(path: impl Into<PathBuf>, tmp_dir: impl Into<PathBuf>, sync: bool) -> Self {
        Self {
            path: path.into(),
            tmp_dir: tmp_dir.into(),
            sync,
        }
    }

    /// Resolve HEAD to a commit id, `None` while the repository has no commits.
    pub fn read(&self) -> StorageResult<Option<ObjectId>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Io(e)),
        };

        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        Ok(Some(ObjectId::from_hex(raw)?))
    }

    /// Point HEAD at `id`.
    pub fn write(&self, id: &ObjectId) -> StorageResult<()> {
        atomic_write(&self.tmp_dir, &self.path, id.as_str().as_bytes(), self.sync)
    }

    /// get the HEAD file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::hash::digest;
    use tempfile::TempDir;

    fn setup_head() -> (TempDir, HeadRef) {
        let dir = TempDir::new().unwrap();
        let head = HeadRef::new(dir.path().join("HEAD"), dir.path().join("tmp"), false);
        (dir, head)
    }

    #[test]
    fn test_unborn_head() {
        let (_dir, head) = setup_head();
        assert_eq!(head.read().unwrap(), None);

        std::fs::write(head.path(), "").unwrap();
        assert_eq!(head.read().unwrap(), None);
    }

    #[test]
    fn test_write_then_read() {
        let (_dir, head) = setup_head();
        let id = digest(b"commit");

        head.write(&id).unwrap();
        assert_eq!(head.read().unwrap(), Some(id.clone()));
        assert_eq!(std::fs::read_to_string(head.path()).unwrap(), id.as_str());
    }

    #[test]
    fn test_trailing_newline_tolerated() {
        let (_dir, head) = setup_head();
        let id = digest(b"commit");
        std::fs::write(head.path(), format!("{}\n", id)).unwrap();

        assert_eq!(head.read().unwrap(), Some(id));
    }

    #[test]
    fn test_garbage_head() {
        let (_dir, head) = setup_head();
        std::fs::write(head.path(), "refs/heads/main").unwrap();

        let result = head.read();
        assert!(matches!(result, Err(StorageError::InvalidObjectId(_))));
    }
}
