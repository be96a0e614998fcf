//! Storage layer error types
//!
//! All errors that can occur during storage operations are defined here
//! We use `thiserror` for ergonomic error definition and better error messages

use std::path::PathBuf;

use thiserror::Error;

use crate::storage::types::{InvalidObjectId, ObjectId};

/// the main error type for storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// no object is stored under the requested hash
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// the staging index could not be parsed as a list of entries
    #[error("corrupt index at {path}: {reason}")]
    CorruptIndex { path: PathBuf, reason: String },

    /// the object exists but does not deserialize into a commit
    #[error("object {id} is not a commit: {reason}")]
    NotACommit { id: ObjectId, reason: String },

    /// the file handed to `add` could not be read
    #[error("cannot read {path}: {source}")]
    SourceFileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// a hash read from disk or user input is malformed
    #[error("invalid object id: {0}")]
    InvalidObjectId(#[from] InvalidObjectId),

    /// repo is not initialized
    #[error("repository not initialized: {0}")]
    NotInitialized(PathBuf),

    /// another writer holds the repository lock
    #[error("repository is locked by another process; if no writer is running, remove {0}")]
    Locked(PathBuf),

    /// JSON serialization or deserialization failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error (filesystem level)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// check if this error indicates the resource doesn't exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::NotFound(_) | StorageError::NotInitialized(_)
        )
    }

    /// check if this error points at damaged on-disk state
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            StorageError::CorruptIndex { .. }
                | StorageError::NotACommit { .. }
                | StorageError::InvalidObjectId(_)
        )
    }
}

/// result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
