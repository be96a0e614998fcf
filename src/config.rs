//! Repository configuration.

use std::path::PathBuf;

/// Default name of the control directory inside a working tree.
pub const DEFAULT_DIR_NAME: &str = ".rocket";

/// Repository configuration options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// Working tree the control directory lives in.
    pub root: PathBuf,
    /// Name of the control directory under `root`.
    pub dir_name: String,
    /// Initialize on open if the control directory is missing.
    pub create_if_missing: bool,
    /// Replace an earlier staged entry for the same path instead of
    /// keeping both.
    pub dedup_staged_paths: bool,
    /// fsync files written through the atomic write path.
    pub sync: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            dir_name: DEFAULT_DIR_NAME.to_string(),
            create_if_missing: false,
            dedup_staged_paths: false,
            sync: true,
        }
    }
}

impl RepositoryConfig {
    /// Create a new configuration for the working tree at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Set the control directory name.
    pub fn dir_name(mut self, value: impl Into<String>) -> Self {
        self.dir_name = value.into();
        self
    }

    /// Set create_if_missing flag.
    pub fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Set dedup_staged_paths flag.
    pub fn dedup_staged_paths(mut self, value: bool) -> Self {
        self.dedup_staged_paths = value;
        self
    }

    /// Set sync flag.
    pub fn sync(mut self, value: bool) -> Self {
        self.sync = value;
        self
    }

    /// Path of the control directory.
    pub fn control_dir(&self) -> PathBuf {
        self.root.join(&self.dir_name)
    }
}
