//! Error types for the protocol layer.
//!
//! Everything here is about bytes and shapes. A `ProtocolError` never
//! means the connection is broken, only that one frame (or one command
//! being built) was bad.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The bytes are not valid UTF-8.
    ///
    /// The server only ever sends UTF-8 JSON, so this usually means the
    /// stream is corrupted or something other than the game server is
    /// on the other end.
    #[error("malformed encoding: {0}")]
    MalformedEncoding(#[source] std::str::Utf8Error),

    /// The text is not a command batch.
    ///
    /// Covers invalid JSON, a missing `commands` array, elements without
    /// a `command` string, and command names outside the vocabulary.
    /// The whole batch is rejected; there are no partial batches.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// A command was constructed from a name outside the vocabulary.
    ///
    /// This is raised by [`Command::named`](crate::Command::named) and
    /// [`CommandKind::from_str`](std::str::FromStr), i.e. by code, not
    /// by the wire. The codec folds it into `MalformedPayload`.
    #[error("{0:?} is not a valid command")]
    InvalidCommandKind(String),

    /// An attribute is missing or has the wrong shape for the typed
    /// reader that asked for it.
    #[error("invalid attribute `{key}`: {reason}")]
    InvalidAttr {
        /// The attribute name.
        key: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Serialization failed.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),
}
