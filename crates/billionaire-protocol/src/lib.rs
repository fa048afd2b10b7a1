//! Wire protocol for the Billionaire client.
//!
//! This crate defines what travels between client and server:
//!
//! - **Commands** ([`Command`], [`CommandKind`]): one tagged,
//!   attribute-bearing instruction.
//! - **Batches** ([`CommandBatch`]): the commands carried by one frame.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): batches to/from bytes.
//! - **Framing** ([`FrameDecoder`]): turning a stream of transport
//!   reads into whole frames.
//! - **Errors** ([`ProtocolError`]): what can go wrong on the way.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the client
//! (game state). It has no idea what a JOIN *means*; it only knows how
//! to recognise one.
//!
//! ```text
//! Transport (bytes) → Protocol (CommandBatch) → Client (dispatch)
//! ```
//!
//! A frame on the wire is a single compact JSON object:
//!
//! ```text
//! {"commands":[{"command":"NEW_OFFER","cards":[{"id":0,"amt":3}]}]}
//! ```

mod batch;
mod codec;
mod command;
mod error;
mod frame;
mod types;

pub use batch::CommandBatch;
pub use codec::{Codec, JsonCodec};
pub use command::{Command, CommandKind};
pub use error::ProtocolError;
pub use frame::{DEFAULT_MAX_FRAME_BYTES, FrameDecoder};
pub use types::ParticipantId;

// Re-exported so downstream crates can build attrs without naming
// serde_json themselves.
pub use serde_json::{Map, Value};
