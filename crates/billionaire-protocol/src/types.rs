//! Identity types shared across the workspace.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The server-issued identifier of a game participant.
///
/// The server hands each connection an opaque id string in JOIN and
/// then refers to players by it in BOOK_EVENT `participants`, offer
/// owners, and BILLIONAIRE announcements. It is a newtype so an owner
/// can never be confused with any other string attribute.
///
/// `#[serde(transparent)]` keeps the wire form a plain JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    /// Creates an id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ParticipantId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
