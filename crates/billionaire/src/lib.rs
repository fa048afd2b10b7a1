//! # Billionaire
//!
//! Protocol client core for the Billionaire card-trading game.
//!
//! The server runs the game; this crate keeps a faithful local picture
//! of it. It frames and parses the JSON command stream, holds outbound
//! commands until the game has started, and reconciles the player's hand
//! and the shared offer book against what the server reports.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use billionaire::prelude::*;
//!
//! # async fn run() -> Result<(), BillionaireError> {
//! let client = BillionaireClient::connect(ClientConfig::from_env()?).await?;
//! client.session().wait_until_started().await?;
//!
//! println!("holding {}", client.hand());
//! let gold: CardMultiset = [(CardId::Gold, 2)].into_iter().collect();
//! client.send_command(Command::new_offer(&gold)).await?;
//!
//! let end = client.closed().await?;
//! println!("{end}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate layout
//!
//! | Crate | What it holds |
//! |---|---|
//! | `billionaire-cards` | [`CardId`], [`CardMultiset`] |
//! | `billionaire-protocol` | [`Command`], [`CommandBatch`], [`JsonCodec`] |
//! | `billionaire-book` | [`OfferBook`] |
//! | `billionaire-session` | [`SessionState`], [`SessionWatch`] |
//! | `billionaire-transport` | [`Connection`], [`TcpConnection`] |
//! | `billionaire` (this one) | [`BillionaireClient`], [`Bot`], [`GameView`] |

mod bot;
mod client;
mod config;
mod dispatch;
mod error;
mod event;
mod state;

pub use bot::{Bot, BotDriver, DEFAULT_BOT_INTERVAL, Issued};
pub use client::{BillionaireClient, ClientBuilder};
pub use config::{ClientConfig, ENV_CONNECT_TIMEOUT_MS, ENV_HOST, ENV_PORT};
pub use dispatch::DISPATCH_ORDER;
pub use error::BillionaireError;
pub use event::{Event, SessionEnd};
pub use state::GameView;

pub use billionaire_book::{BookError, Offer, OfferBook};
pub use billionaire_cards::{CardEntry, CardError, CardId, CardMultiset};
pub use billionaire_protocol::{
    Codec, Command, CommandBatch, CommandKind, FrameDecoder, JsonCodec, ParticipantId,
    ProtocolError,
};
pub use billionaire_session::{SessionError, SessionState, SessionWatch};
pub use billionaire_transport::{
    Connection, ConnectionId, StreamConnection, TcpConnection, TransportError,
};

/// Everything a bot author needs, in one import.
pub mod prelude {
    pub use crate::{
        BillionaireClient, BillionaireError, Bot, BotDriver, CardId, CardMultiset, ClientBuilder,
        ClientConfig, Command, CommandBatch, CommandKind, Event, GameView, Issued, OfferBook,
        ParticipantId, SessionEnd, SessionState,
    };
}
