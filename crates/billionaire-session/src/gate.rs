//! Observable session state: one writer, many waiters.
//!
//! The connection task owns the [`SessionGate`] and feeds it events as
//! commands arrive. Everyone else holds a [`SessionWatch`] and can read
//! the state or `await` a particular one.
//!
//! `tokio::sync::watch` fits exactly: it stores only the latest value,
//! any number of receivers can wait on it, and when the sender is
//! dropped every receiver is woken with an error. That last property is
//! what turns "the connection died" into [`SessionError::Closed`] for
//! every waiter at once.

use tokio::sync::watch;

use crate::{SessionError, SessionEvent, SessionMachine, SessionState, Transition};

/// What the watch channel carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Snapshot {
    state: SessionState,
    closed: bool,
}

/// The writing half: owns the [`SessionMachine`], publishes each change.
#[derive(Debug)]
pub struct SessionGate {
    machine: SessionMachine,
    tx: watch::Sender<Snapshot>,
}

impl Default for SessionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionGate {
    /// A gate in `Disconnected`, not yet closed.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Snapshot {
            state: SessionState::Disconnected,
            closed: false,
        });
        Self {
            machine: SessionMachine::new(),
            tx,
        }
    }

    /// A new reader.
    pub fn watch(&self) -> SessionWatch {
        SessionWatch {
            rx: self.tx.subscribe(),
        }
    }

    /// The current state.
    pub fn state(&self) -> SessionState {
        self.machine.state()
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.tx.borrow().closed
    }

    /// Applies `event` and wakes waiters if the state changed.
    ///
    /// # Errors
    /// - [`SessionError::Closed`] after [`close`](Self::close).
    /// - [`SessionError::InvalidTransition`] if the machine refuses it.
    pub fn apply(&mut self, event: SessionEvent) -> Result<Transition, SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }

        let transition = self.machine.apply(event)?;
        if transition.changed() {
            tracing::info!(from = %transition.from, to = %transition.to, "session state changed");
            let state = transition.to;
            self.tx.send_modify(|snapshot| snapshot.state = state);
        } else {
            tracing::debug!(state = %transition.to, %event, "session event changed nothing");
        }
        Ok(transition)
    }

    /// Ends the session for good.
    ///
    /// The state becomes `Disconnected` and every current and future
    /// wait fails with [`SessionError::Closed`]. Calling it twice is
    /// harmless.
    pub fn close(&mut self) {
        if self.is_closed() {
            return;
        }
        let transition = self.machine.disconnect();
        tracing::info!(from = %transition.from, "session closed");
        self.tx.send_replace(Snapshot {
            state: SessionState::Disconnected,
            closed: true,
        });
    }
}

/// The reading half. Cheap to clone; every clone sees the same state.
#[derive(Debug, Clone)]
pub struct SessionWatch {
    rx: watch::Receiver<Snapshot>,
}

impl SessionWatch {
    /// The current state.
    pub fn state(&self) -> SessionState {
        self.rx.borrow().state
    }

    /// Returns `true` once the session is over (or its gate is gone).
    pub fn is_closed(&self) -> bool {
        self.rx.borrow().closed || self.rx.has_changed().is_err()
    }

    /// Resolves once the server has joined us.
    ///
    /// Stays satisfied through Started and Finished.
    ///
    /// # Errors
    /// [`SessionError::Closed`] if the session ends first.
    pub async fn wait_until_joined(&self) -> Result<SessionState, SessionError> {
        self.wait_for(SessionState::is_joined).await
    }

    /// Resolves once a game is running.
    ///
    /// After FINISH this blocks again until the next START.
    ///
    /// # Errors
    /// [`SessionError::Closed`] if the session ends first.
    pub async fn wait_until_started(&self) -> Result<SessionState, SessionError> {
        self.wait_for(SessionState::is_started).await
    }

    /// Resolves once the session is over. Never fails.
    pub async fn wait_until_closed(&self) {
        let mut rx = self.rx.clone();
        // An Err here means the gate was dropped, which is closed too.
        let _ = rx.wait_for(|snapshot| snapshot.closed).await;
    }

    async fn wait_for(
        &self,
        reached: fn(SessionState) -> bool,
    ) -> Result<SessionState, SessionError> {
        let mut rx = self.rx.clone();
        let snapshot = *rx
            .wait_for(|snapshot| snapshot.closed || reached(snapshot.state))
            .await
            .map_err(|_| SessionError::Closed)?;

        if snapshot.closed {
            Err(SessionError::Closed)
        } else {
            Ok(snapshot.state)
        }
    }
}
