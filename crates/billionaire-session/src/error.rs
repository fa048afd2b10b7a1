//! Error types for the session layer.

use crate::{SessionEvent, SessionState};

/// Errors that can occur while tracking the session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The session is over (disconnect or shutdown).
    ///
    /// Returned to anyone still waiting on a gate so they can stop
    /// instead of hanging forever.
    #[error("session closed")]
    Closed,

    /// The event cannot happen in the current state, for example a
    /// second `connect` or a START on a connection that was never
    /// opened.
    #[error("cannot {event} while {from}")]
    InvalidTransition {
        /// State the session was in.
        from: SessionState,
        /// What was attempted.
        event: SessionEvent,
    },
}
