//! Shared identifier types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a book, as read from its tag
///
/// Compared by exact string match. Tags carry numeric card ids, which are
/// stored in decimal form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(String);

impl BookId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u32> for BookId {
    fn from(id: u32) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for BookId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}
