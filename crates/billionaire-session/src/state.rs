//! Session states and the pure transition function.

use std::fmt;

use billionaire_protocol::CommandKind;
use serde::Serialize;

use crate::SessionError;

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Where the client is in its life with the server.
///
/// - **Disconnected**: no connection (initial and terminal).
/// - **Connected**: TCP is up, the server has not said JOIN yet.
/// - **Joined**: the server accepted us; waiting for a game.
/// - **Started**: a game is running. Gameplay sends flow only here.
/// - **Finished**: the game ended. Still joined, so a later START
///   begins the next game on the same connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connected,
    Joined,
    Started,
    Finished,
}

impl SessionState {
    /// Returns `true` once the server has joined us (Joined, Started or
    /// Finished).
    pub fn is_joined(self) -> bool {
        matches!(
            self,
            SessionState::Joined | SessionState::Started | SessionState::Finished
        )
    }

    /// Returns `true` while a game is running.
    pub fn is_started(self) -> bool {
        self == SessionState::Started
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connected => "connected",
            SessionState::Joined => "joined",
            SessionState::Started => "started",
            SessionState::Finished => "finished",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// SessionEvent
// ---------------------------------------------------------------------------

/// Something that can move the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SessionEvent {
    /// The transport came up.
    Connect,
    /// JOIN arrived.
    Join,
    /// START arrived.
    Start,
    /// FINISH or END_GAME arrived.
    Finish,
    /// The transport went away, or the client shut down.
    Disconnect,
}

impl SessionEvent {
    /// The event an inbound command triggers, if any.
    ///
    /// Most commands (trades, book updates) don't touch the session.
    pub fn from_kind(kind: CommandKind) -> Option<Self> {
        match kind {
            CommandKind::Join => Some(SessionEvent::Join),
            CommandKind::Start => Some(SessionEvent::Start),
            kind if kind.is_finish() => Some(SessionEvent::Finish),
            _ => None,
        }
    }
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionEvent::Connect => "connect",
            SessionEvent::Join => "join",
            SessionEvent::Start => "start",
            SessionEvent::Finish => "finish",
            SessionEvent::Disconnect => "disconnect",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// SessionMachine
// ---------------------------------------------------------------------------

/// The outcome of one accepted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: SessionState,
    pub to: SessionState,
}

impl Transition {
    /// Returns `false` if the event was accepted but changed nothing,
    /// like a repeated JOIN.
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// The session state and the rules for moving it.
///
/// Pure: no channels, no clocks. [`SessionGate`](crate::SessionGate)
/// wraps one of these to make the state observable.
///
/// The server is authoritative, so the machine is lenient about
/// messages it can make sense of. A repeated JOIN or START while
/// already there is accepted as a no-op, and START straight from
/// Connected (a server that skips JOIN) moves to Started. What it
/// refuses is what cannot happen on a live socket: anything but
/// `connect` while disconnected, or `connect` twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionMachine {
    state: SessionState,
}

impl SessionMachine {
    /// A machine in `Disconnected`.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Applies `event`.
    ///
    /// # Errors
    /// Returns [`SessionError::InvalidTransition`] and leaves the state
    /// unchanged if `event` is impossible from here.
    pub fn apply(&mut self, event: SessionEvent) -> Result<Transition, SessionError> {
        use SessionEvent as E;
        use SessionState as S;

        let from = self.state;
        let to = match (from, event) {
            (S::Disconnected, E::Connect) => S::Connected,
            (_, E::Disconnect) => S::Disconnected,
            (S::Disconnected, _) | (_, E::Connect) => {
                return Err(SessionError::InvalidTransition { from, event });
            }

            (S::Connected | S::Finished, E::Join) => S::Joined,
            (S::Joined | S::Started, E::Join) => from,

            (_, E::Start) => S::Started,

            (S::Connected, E::Finish) => {
                return Err(SessionError::InvalidTransition { from, event });
            }
            (_, E::Finish) => S::Finished,
        };

        self.state = to;
        Ok(Transition { from, to })
    }

    /// Shorthand for `apply(SessionEvent::Connect)`.
    pub fn connect(&mut self) -> Result<Transition, SessionError> {
        self.apply(SessionEvent::Connect)
    }

    /// Shorthand for `apply(SessionEvent::Join)`.
    pub fn join(&mut self) -> Result<Transition, SessionError> {
        self.apply(SessionEvent::Join)
    }

    /// Shorthand for `apply(SessionEvent::Start)`.
    pub fn start(&mut self) -> Result<Transition, SessionError> {
        self.apply(SessionEvent::Start)
    }

    /// Shorthand for `apply(SessionEvent::Finish)`.
    pub fn finish(&mut self) -> Result<Transition, SessionError> {
        self.apply(SessionEvent::Finish)
    }

    /// Shorthand for `apply(SessionEvent::Disconnect)`. Never fails.
    pub fn disconnect(&mut self) -> Transition {
        let from = self.state;
        self.state = SessionState::Disconnected;
        Transition {
            from,
            to: SessionState::Disconnected,
        }
    }
}
