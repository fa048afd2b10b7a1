//! Notifications published by the client.

use std::fmt;

use billionaire_protocol::Command;

/// Something the client saw or did.
///
/// Delivered over a `tokio::sync::broadcast` channel from
/// [`BillionaireClient::subscribe`](crate::BillionaireClient::subscribe).
/// `Received` is published *after* the command has been applied, so a
/// subscriber that reads a snapshot on `Received` sees its effect.
#[derive(Debug, Clone)]
pub enum Event {
    /// An inbound command, already applied to the game state.
    Received(Command),

    /// An outbound command, now on the wire.
    Sent(Command),

    /// An inbound frame was discarded. The session continues.
    FrameDropped { reason: String },

    /// The session is over. Always the last event.
    Disconnected { reason: String },
}

/// Why a session ended without a transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The server closed the connection.
    ServerClosed,
    /// [`BillionaireClient::shutdown`](crate::BillionaireClient::shutdown)
    /// was called, or the client was dropped.
    Shutdown,
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEnd::ServerClosed => f.write_str("server closed the connection"),
            SessionEnd::Shutdown => f.write_str("client shut down"),
        }
    }
}
