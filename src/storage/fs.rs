//! Atomic file replacement.
//!
//! Writes go to a temp file inside the repository's `tmp/` directory, get
//! flushed, and are then renamed over the target. `tmp/` lives on the same
//! filesystem as the target so the rename is atomic on POSIX systems.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::storage::error::StorageResult;

/// Atomically replace `target` with `data`.
pub fn atomic_write(tmp_dir: &Path, target: &Path, data: &[u8], sync: bool) -> StorageResult<()> {
    std::fs::create_dir_all(tmp_dir)?;

    let mut temp = NamedTempFile::new_in(tmp_dir)?;
    temp.write_all(data)?;
    if sync {
        temp.as_file().sync_all()?;
    }

    temp.persist(target).map_err(|e| e.error)?;

    if sync {
        // best effort, some filesystems refuse to open directories
        if let Some(parent) = target.parent() {
            if let Ok(dir) = std::fs::File::open(parent) {
                let _ = dir.sync_all();
            }
        }
    }

    Ok(())
}

/// Remove leftovers of interrupted writes. Returns how many were removed.
pub fn clean_tmp_dir(tmp_dir: &Path) -> StorageResult<usize> {
    if !tmp_dir.exists() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in std::fs::read_dir(tmp_dir)? {
        let path = entry?.path();
        if path.is_file() {
            std::fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}
