//! Content hashing.
//!
//! Every object is named by the SHA-1 of its raw bytes, hex encoded.
//! Text is always hashed as UTF-8 so ids stay stable across platforms.

use sha1::{Digest, Sha1};

use crate::storage::types::ObjectId;

/// Hash a byte slice into an [`ObjectId`].
pub fn digest(bytes: &[u8]) -> ObjectId {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    ObjectId::from_digest(hex::encode(hasher.finalize()))
}

/// Hash a string's UTF-8 encoding.
pub fn digest_str(text: &str) -> ObjectId {
    digest(text.as_bytes())
}
