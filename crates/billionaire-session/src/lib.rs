//! Session lifecycle for the Billionaire client.
//!
//! The server drives the session: nothing the client sends changes its
//! state, only what it hears back. This crate has two halves:
//!
//! - [`SessionMachine`]: pure transitions over [`SessionState`], no I/O.
//! - [`SessionGate`] / [`SessionWatch`]: the machine behind a
//!   `tokio::sync::watch` channel, so other tasks can *wait* for a state
//!   ("don't send until the game has started").
//!
//! ```text
//!  Disconnected ─connect→ Connected ─JOIN→ Joined ─START→ Started
//!                                                   ↑          │
//!                                                 START      FINISH
//!                                                   │          ↓
//!                                                   └─ Finished ┘
//!
//!  any state ─disconnect→ Disconnected
//! ```

mod error;
mod gate;
mod state;

pub use error::SessionError;
pub use gate::{SessionGate, SessionWatch};
pub use state::{SessionEvent, SessionMachine, SessionState, Transition};
