//! Rocket - a minimal local version-control engine
//!
//! Files are stored as immutable objects named by the SHA-1 of their
//! contents, staged in an index, and recorded as commits that link back to
//! their parent. Everything lives in a `.rocket/` directory next to the
//! files being tracked.
//!
//! # Example
//!
//! ```no_run
//! use rocket::config::RepositoryConfig;
//! use rocket::storage::Repository;
//!
//! let repo = Repository::init(RepositoryConfig::new("./my_project")).unwrap();
//! repo.add("./my_project/notes.txt").unwrap();
//! repo.commit("Add notes").unwrap();
//! ```

pub mod config;
pub mod storage;
