//!  Commit creation and history traversal
//!
//!  commits are the snapshots of the staging index. In rocket:
//! - each commit records every staged entry plus the previous HEAD
//! - a commit is stored like any other object, named by the hash of its JSON
//! - history is the chain of parent links from HEAD back to the root
//!
//! this module handles commit serialization, lookup and history walking

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::object::ObjectStore;
use crate::storage::types::{ObjectId, StagingEntry};

/// a commit record as stored in the object store
///
/// Field order is the serialization order and therefore part of the hash:
/// ```text
/// {"timestamp":"…","message":"…","files":[{"path":"…","hash":"…"}],"parent":null}
/// ```
///
/// Parsing is strict: every field must be present, `parent` included, and
/// unknown fields are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Commit {
    /// RFC 3339 creation time, UTC with millisecond precision
    pub timestamp: String,
    pub message: String,
    /// the staging index at commit time
    pub files: Vec<StagingEntry>,
    /// previous HEAD, `None` for the root commit
    #[serde(deserialize_with = "required_parent")]
    pub parent: Option<ObjectId>,
}

// a plain `Option` field would accept a missing key as `None`
fn required_parent<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<ObjectId>, D::Error> {
    Option::deserialize(deserializer)
}

impl Commit {
    /// serialize to the canonical byte form
    pub fn to_bytes(&self) -> StorageResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// check if this is the first commit of the chain
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// get a short summary of the commit (first line of message)
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or(&self.message)
    }

    /// the timestamp as a date, if it parses
    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}

/// format a timestamp the way commits store it
pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// builder for creating commits with a fluent interface
pub struct CommitBuilder<'a> {
    store: &'a ObjectStore,
    files: Vec<StagingEntry>,
    parent: Option<ObjectId>,
    message: String,
    time: Option<DateTime<Utc>>,
}

impl<'a> CommitBuilder<'a> {
    /// create a new CommitBuilder
    pub fn new(store: &'a ObjectStore) -> Self {
        Self {
            store,
            files: Vec::new(),
            parent: None,
            message: String::new(),
            time: None,
        }
    }

    /// set the staged files recorded by this commit
    pub fn files(mut self, files: Vec<StagingEntry>) -> Self {
        self.files = files;
        self
    }

    /// set the parent commit
    pub fn parent(mut self, parent: Option<ObjectId>) -> Self {
        self.parent = parent;
        self
    }

    /// set the commit message
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// pin the timestamp instead of reading the clock
    pub fn time(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    /// assemble the record without storing it
    pub fn build(self) -> Commit {
        Commit {
            timestamp: format_timestamp(self.time.unwrap_or_else(Utc::now)),
            message: self.message,
            files: self.files,
            parent: self.parent,
        }
    }

    /// store the commit object and return its ID
    ///
    /// This only writes the object; moving HEAD is up to the caller.
    pub fn commit(self) -> StorageResult<ObjectId> {
        let store = self.store;
        let bytes = self.build().to_bytes()?;
        store.put(&bytes)
    }
}

/// read and decode the commit stored under `id`
pub fn read_commit(store: &ObjectStore, id: &ObjectId) -> StorageResult<Commit> {
    let bytes = store.get(id)?;
    serde_json::from_slice(&bytes).map_err(|e| StorageError::NotACommit {
        id: id.clone(),
        reason: e.to_string(),
    })
}

/// one line of `log` output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub hash: ObjectId,
    pub timestamp: String,
    pub message: String,
}

/// iterate over commit history, newest first
///
/// Reads one object per step. Iteration ends after the root commit, or
/// right after yielding the first error.
pub struct History<'a> {
    store: &'a ObjectStore,
    next: Option<ObjectId>,
}

impl<'a> History<'a> {
    /// walk from `start` (usually HEAD) back to the root
    pub fn new(store: &'a ObjectStore, start: Option<ObjectId>) -> Self {
        Self { store, next: start }
    }
}

impl Iterator for History<'_> {
    type Item = StorageResult<LogEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let hash = self.next.take()?;
        match read_commit(self.store, &hash) {
            Ok(commit) => {
                self.next = commit.parent;
                Some(Ok(LogEntry {
                    hash,
                    timestamp: commit.timestamp,
                    message: commit.message,
                }))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::hash::digest;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn setup_store() -> (TempDir, ObjectStore) {
        let dir = TempDir::new().unwrap();
        let objects = dir.path().join("objects");
        std::fs::create_dir_all(&objects).unwrap();
        let store = ObjectStore::new(objects, dir.path().join("tmp"), false);
        (dir, store)
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_serialization_format() {
        let commit = Commit {
            timestamp: format_timestamp(fixed_time()),
            message: "first".to_string(),
            files: vec![StagingEntry::new("sample.txt", digest(b"hello"))],
            parent: None,
        };

        let json = String::from_utf8(commit.to_bytes().unwrap()).unwrap();
        assert_eq!(
            json,
            concat!(
                r#"{"timestamp":"2024-03-01T12:30:00.000Z","message":"first","#,
                r#""files":[{"path":"sample.txt","hash":"aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d"}],"#,
                r#""parent":null}"#
            )
        );
    }

    #[test]
    fn test_commit_builder() {
        let (_dir, store) = setup_store();
        let files = vec![StagingEntry::new("a.txt", store.put(b"a").unwrap())];

        let id = CommitBuilder::new(&store)
            .files(files.clone())
            .message("Add a\n\nlonger body")
            .time(fixed_time())
            .commit()
            .unwrap();

        let commit = read_commit(&store, &id).unwrap();
        assert!(commit.is_root());
        assert_eq!(commit.files, files);
        assert_eq!(commit.summary(), "Add a");
        assert_eq!(commit.time(), Some(fixed_time()));
        // the id is the digest of the stored bytes
        assert_eq!(id, digest(&commit.to_bytes().unwrap()));
    }

    #[test]
    fn test_same_record_same_id() {
        let (_dir, store) = setup_store();
        let build = || {
            CommitBuilder::new(&store)
                .message("same")
                .time(fixed_time())
                .commit()
                .unwrap()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_read_missing_commit() {
        let (_dir, store) = setup_store();
        let result = read_commit(&store, &digest(b"never written"));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_read_non_commit_object() {
        let (_dir, store) = setup_store();
        let blob = store.put(b"hello").unwrap();

        let result = read_commit(&store, &blob);
        assert!(matches!(result, Err(StorageError::NotACommit { .. })));
    }

    #[test]
    fn test_read_rejects_incomplete_or_extra_fields() {
        let (_dir, store) = setup_store();
        let files = r#"[{"path":"a.txt","hash":"aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d"}]"#;

        let no_parent = format!(
            r#"{{"timestamp":"2024-01-01T00:00:00.000Z","message":"m","files":{}}}"#,
            files
        );
        let id = store.put(no_parent.as_bytes()).unwrap();
        assert!(matches!(read_commit(&store, &id), Err(StorageError::NotACommit { .. })));

        let extra = format!(
            r#"{{"timestamp":"2024-01-01T00:00:00.000Z","message":"m","files":{},"parent":null,"author":"x"}}"#,
            files
        );
        let id = store.put(extra.as_bytes()).unwrap();
        assert!(matches!(read_commit(&store, &id), Err(StorageError::NotACommit { .. })));

        let root = format!(
            r#"{{"timestamp":"2024-01-01T00:00:00.000Z","message":"m","files":{},"parent":null}}"#,
            files
        );
        let id = store.put(root.as_bytes()).unwrap();
        let commit = read_commit(&store, &id).unwrap();
        assert!(commit.is_root());
        assert_eq!(commit.files.len(), 1);
    }

    #[test]
    fn test_history_iteration() {
        let (_dir, store) = setup_store();

        let c1 = CommitBuilder::new(&store).message("First").commit().unwrap();
        let c2 = CommitBuilder::new(&store)
            .parent(Some(c1.clone()))
            .message("Second")
            .commit()
            .unwrap();
        let c3 = CommitBuilder::new(&store)
            .parent(Some(c2.clone()))
            .message("Third")
            .commit()
            .unwrap();

        let commits: Vec<_> = History::new(&store, Some(c3.clone()))
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(commits.len(), 3);
        assert_eq!(commits[0].hash, c3);
        assert_eq!(commits[1].hash, c2);
        assert_eq!(commits[2].hash, c1);
        assert_eq!(commits[2].message, "First");
    }

    #[test]
    fn test_history_empty() {
        let (_dir, store) = setup_store();
        assert_eq!(History::new(&store, None).count(), 0);
    }

    #[test]
    fn test_history_stops_after_error() {
        let (_dir, store) = setup_store();
        let dangling = digest(b"missing parent");
        let tip = CommitBuilder::new(&store)
            .parent(Some(dangling))
            .message("orphan")
            .commit()
            .unwrap();

        let items: Vec<_> = History::new(&store, Some(tip)).collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(StorageError::NotFound(_))));
    }
}
