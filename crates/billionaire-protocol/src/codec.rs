//! Codec trait and the JSON implementation.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes.
//! The client never calls `serde_json` directly; it holds something that
//! implements [`Codec`] and asks it to encode outgoing batches and
//! decode incoming frames. The Billionaire server only speaks JSON, so
//! [`JsonCodec`] is the one implementation, but tests can swap in
//! another without touching the client.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that encodes values to bytes and decodes bytes back.
///
/// ## Trait bounds
///
/// - `Send + Sync` → the client's connection task may run on any thread
///   in Tokio's pool, and the codec travels with it.
/// - `'static` → the codec owns everything it needs; it is stored in a
///   long-lived task.
///
/// `decode` uses `DeserializeOwned` so the result never borrows from
/// the frame buffer, which is recycled right after decoding.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// - [`ProtocolError::MalformedEncoding`] if the bytes are not UTF-8.
    /// - [`ProtocolError::MalformedPayload`] if the text does not parse
    ///   as `T`.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// Output is compact (no whitespace) with `command` as the first key of
/// every command object, which is what the server's parser expects.
///
/// ## Example
///
/// ```rust
/// use billionaire_protocol::{Codec, Command, CommandBatch, CommandKind, JsonCodec};
///
/// let codec = JsonCodec;
/// let batch = CommandBatch::from(Command::cancel_offer(3));
///
/// let bytes = codec.encode(&batch).unwrap();
/// assert_eq!(bytes, br#"{"commands":[{"command":"CANCEL_OFFER","card_amt":3}]}"#);
///
/// let decoded: CommandBatch = codec.decode(&bytes).unwrap();
/// assert!(decoded.contains(CommandKind::CancelOffer));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        // UTF-8 is checked separately so a corrupted stream and a bad
        // document are reported as different failures.
        let text = std::str::from_utf8(data).map_err(ProtocolError::MalformedEncoding)?;
        serde_json::from_str(text).map_err(|e| ProtocolError::MalformedPayload(e.to_string()))
    }
}
