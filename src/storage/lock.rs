//! Writer lock for the repository.
//!
//! `add` and `commit` hold `.rocket/lock` while they run. The file is created
//! with create-new semantics, holds the owner's pid, and is removed on drop.
//! A second writer fails fast with [`StorageError::Locked`].

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::storage::error::{StorageError, StorageResult};

/// Held while a mutating operation runs.
#[derive(Debug)]
pub struct RepoLock {
    path: PathBuf,
}

impl RepoLock {
    /// Acquire the lock at `path` without blocking.
    pub fn acquire(path: &Path) -> StorageResult<Self> {
        match Self::try_create(path) {
            Err(StorageError::Locked(_)) if Self::is_stale(path) => {
                warn!(path = %path.display(), "removing stale repository lock");
                std::fs::remove_file(path)?;
                Self::try_create(path)
            }
            result => result,
        }
    }

    fn try_create(path: &Path) -> StorageResult<Self> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StorageError::Locked(path.to_path_buf()))
            }
            Err(e) => return Err(StorageError::Io(e)),
        };

        let lock = Self {
            path: path.to_path_buf(),
        };
        // built before writing so a failed write still removes the file
        file.write_all(std::process::id().to_string().as_bytes())?;
        Ok(lock)
    }

    /// A lock is stale when its owner pid is known and no longer running.
    fn is_stale(path: &Path) -> bool {
        let Ok(raw) = std::fs::read_to_string(path) else {
            return false;
        };
        match raw.trim().parse::<u32>() {
            Ok(pid) => pid != std::process::id() && !is_process_alive(pid),
            Err(_) => false,
        }
    }
}

impl Drop for RepoLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(target_os = "linux")]
fn is_process_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{}", pid)).exists()
}

#[cfg(not(target_os = "linux"))]
fn is_process_alive(_pid: u32) -> bool {
    // no cheap liveness check, assume the owner is alive
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lock_lifecycle() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lock");

        let lock = RepoLock::acquire(&path).unwrap();
        assert!(path.exists());
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            std::process::id().to_string()
        );

        let second = RepoLock::acquire(&path);
        assert!(matches!(second, Err(StorageError::Locked(_))));

        drop(lock);
        assert!(!path.exists());
        assert!(RepoLock::acquire(&path).is_ok());
    }

    #[test]
    fn test_unreadable_owner_is_not_stale() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lock");
        std::fs::write(&path, "").unwrap();

        assert!(matches!(RepoLock::acquire(&path), Err(StorageError::Locked(_))));
        assert!(path.exists());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_stale_lock_is_replaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lock");
        // pid_max on linux is at most 2^22, so this pid cannot exist
        std::fs::write(&path, "4294967295").unwrap();

        let _lock = RepoLock::acquire(&path).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            std::process::id().to_string()
        );
    }
}
