//! Error types for the transport layer.

use std::time::Duration;

/// Errors that can occur in the transport layer.
///
/// Unlike protocol errors, every one of these ends the session: the
/// byte stream is gone or was never there.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Nothing is listening at the address.
    ///
    /// Reported to the caller as-is; the client never retries.
    #[error("connection refused by {addr}")]
    ConnectionRefused {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Connecting failed for another reason (bad address, unreachable
    /// network, ...).
    #[error("failed to connect to {addr}: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The connect attempt did not finish in time.
    #[error("timed out after {timeout:?} connecting to {addr}")]
    ConnectTimeout { addr: String, timeout: Duration },

    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),
}
