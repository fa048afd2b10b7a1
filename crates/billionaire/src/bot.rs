//! The seam for automated players.
//!
//! A [`Bot`] decides; the [`BotDriver`] asks it on a fixed cadence and
//! sends whatever it answers. The bot never touches the connection and
//! the driver never makes a decision.

use std::future::Future;
use std::time::Duration;

use billionaire_protocol::{Command, CommandBatch};
use tokio::time::MissedTickBehavior;

use crate::{BillionaireClient, BillionaireError, GameView, SessionEnd};

/// How often the driver consults the bot by default.
pub const DEFAULT_BOT_INTERVAL: Duration = Duration::from_secs(1);

/// What a bot wants to do this cycle.
///
/// Bots return whichever shape is natural for them; the driver
/// normalizes with [`into_batch`](Self::into_batch).
#[derive(Debug, Clone)]
pub enum Issued {
    /// One command.
    Command(Command),
    /// Several commands, sent together in one frame.
    Commands(Vec<Command>),
    /// A ready-made batch.
    Batch(CommandBatch),
    /// Nothing to do right now.
    Idle,
}

impl Issued {
    /// The batch to send, or `None` if there is nothing to send.
    pub fn into_batch(self) -> Option<CommandBatch> {
        let batch = match self {
            Issued::Command(command) => CommandBatch::from(command),
            Issued::Commands(commands) => CommandBatch::from(commands),
            Issued::Batch(batch) => batch,
            Issued::Idle => return None,
        };
        (!batch.is_empty()).then_some(batch)
    }
}

impl From<Command> for Issued {
    fn from(command: Command) -> Self {
        Issued::Command(command)
    }
}

impl From<Option<Command>> for Issued {
    fn from(command: Option<Command>) -> Self {
        command.map_or(Issued::Idle, Issued::Command)
    }
}

/// A trading policy.
///
/// ## Why `impl Future + Send` instead of `async fn`?
///
/// The driver usually runs inside `tokio::spawn`, which needs a `Send`
/// future. Spelling the return type out lets the trait promise that;
/// implementors still write a plain `async fn`:
///
/// ```rust
/// use billionaire::prelude::*;
///
/// struct Passive;
///
/// impl Bot for Passive {
///     async fn issue_command(&mut self, _view: &GameView) -> Issued {
///         Issued::Idle
///     }
/// }
/// ```
pub trait Bot: Send {
    /// Looks at the game and decides what to send.
    fn issue_command(&mut self, view: &GameView) -> impl Future<Output = Issued> + Send;
}

/// Runs a [`Bot`] against a client until the session ends.
pub struct BotDriver<B> {
    client: BillionaireClient,
    bot: B,
    interval: Duration,
}

impl<B: Bot> BotDriver<B> {
    /// Drives `bot` over `client` every [`DEFAULT_BOT_INTERVAL`].
    pub fn new(client: BillionaireClient, bot: B) -> Self {
        Self {
            client,
            bot,
            interval: DEFAULT_BOT_INTERVAL,
        }
    }

    /// Changes how often the bot is consulted.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// The client being driven.
    pub fn client(&self) -> &BillionaireClient {
        &self.client
    }

    /// Consults the bot once per interval while a game is running and
    /// sends what it issues. Returns when the session ends, with the
    /// session's own result.
    ///
    /// # Errors
    /// The transport error that ended the session, if one did.
    pub async fn run(mut self) -> Result<SessionEnd, BillionaireError> {
        let session = self.client.session();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = session.wait_until_closed() => break,
                _ = ticker.tick() => {}
            }

            if !session.state().is_started() {
                continue;
            }

            let view = self.client.view();
            let Some(batch) = self.bot.issue_command(&view).await.into_batch() else {
                continue;
            };

            tracing::debug!(commands = batch.len(), "bot issued commands");
            match self.client.send_command(batch).await {
                Ok(()) => {}
                Err(BillionaireError::Disconnected) => break,
                Err(e) => tracing::warn!(error = %e, "bot command not sent"),
            }
        }

        self.client.closed().await
    }
}
