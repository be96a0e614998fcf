//! storage layer for rocket
//!
//! this module provides the whole on-disk model: a content-addressed object
//! store, the staging index, the HEAD pointer and the commit chain on top.
//! The CLI only talks to [`Repository`].
//!
//!  # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Repository                           │
//! │        (High-level API: init, add, commit, log, show)       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!        ┌─────────────────────┼─────────────────────┐
//!        │                     │                     │
//!        ▼                     ▼                     ▼
//!  ┌─────────────┐       ┌─────────────┐       ┌─────────────┐
//!  │   index     │       │   commit    │       │   journal   │
//!  │  (staging)  │       │  (history)  │       │ (HEAD+index)│
//!  └─────────────┘       └─────────────┘       └─────────────┘
//!         │                     │                     │
//!         └─────────────────────┼─────────────────────┘
//!                               │
//!                               ▼
//!                        ┌─────────────┐
//!                        │   object    │
//!                        │  (by hash)  │
//!                        └─────────────┘
//!  ```
//!
//! # Usage
//!
//! ```no_run
//! use rocket::config::RepositoryConfig;
//! use rocket::storage::Repository;
//!
//! let repo = Repository::init(RepositoryConfig::new("."))?;
//! repo.add("sample.txt")?;
//! let head = repo.commit("first")?;
//! assert_eq!(repo.head()?, Some(head));
//!
//! for entry in repo.log()? {
//!     let entry = entry?;
//!     println!("{} {}", entry.hash.short(), entry.message);
//! }
//! # Ok::<(), rocket::storage::StorageError>(())
//! ```

mod commit;
mod error;
mod fs;
mod hash;
mod index;
mod journal;
mod lock;
mod object;
mod refs;
mod repository;
mod types;

// Re-export public API
pub use commit::{format_timestamp, read_commit, Commit, CommitBuilder, History, LogEntry};
pub use error::{StorageError, StorageResult};
pub use hash::{digest, digest_str};
pub use index::StagingIndex;
pub use journal::{CommitJournal, RecoveryReport};
pub use object::ObjectStore;
pub use refs::HeadRef;
pub use repository::{InitOutcome, Repository, RepositoryStats};
pub use types::{InvalidObjectId, ObjectId, StagingEntry};
