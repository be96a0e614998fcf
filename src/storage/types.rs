//! core type-safe wrappers for the storage layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Hex digest naming a stored object.
///
/// Always 40 lowercase hex characters (SHA-1). Construct one through
/// [`crate::storage::hash::digest`] or parse it with [`ObjectId::from_hex`];
/// both guarantee the format, so paths built from it stay inside `objects/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId(String);

impl ObjectId {
    /// length of a hex encoded id
    pub const HEX_LEN: usize = 40;

    /// wrap a digest that is already known to be well formed
    pub(crate) fn from_digest(hex: String) -> Self {
        debug_assert_eq!(hex.len(), Self::HEX_LEN);
        Self(hex)
    }

    /// parse an ObjectId from a hex string
    pub fn from_hex(hex: &str) -> Result<Self, InvalidObjectId> {
        if hex.len() != Self::HEX_LEN {
            return Err(InvalidObjectId::Length(hex.len()));
        }
        if let Some((position, c)) = hex
            .char_indices()
            .find(|(_, c)| !matches!(*c, '0'..='9' | 'a'..='f'))
        {
            return Err(InvalidObjectId::Character { char: c, position });
        }
        Ok(Self(hex.to_string()))
    }

    /// short form of the id
    pub fn short(&self) -> &str {
        &self.0[..7]
    }

    /// get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for ObjectId {
    type Err = InvalidObjectId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for ObjectId {
    type Error = InvalidObjectId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

/// a file queued for the next commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingEntry {
    /// path as it was handed to `add`
    pub path: String,
    /// hash of the file contents at the time it was staged
    pub hash: ObjectId,
}

impl StagingEntry {
    pub fn new(path: impl Into<String>, hash: ObjectId) -> Self {
        Self {
            path: path.into(),
            hash,
        }
    }
}

/// error type for malformed object ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidObjectId {
    Length(usize),
    Character { char: char, position: usize },
}

impl fmt::Display for InvalidObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Length(len) => write!(
                f,
                "expected {} hex characters, got {}",
                ObjectId::HEX_LEN,
                len
            ),
            Self::Character { char, position } => {
                write!(f, "invalid character '{}' at position {}", char, position)
            }
        }
    }
}

impl std::error::Error for InvalidObjectId {}
