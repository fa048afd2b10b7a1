//! Unified error type for the Billionaire client.

use billionaire_book::BookError;
use billionaire_cards::CardError;
use billionaire_protocol::ProtocolError;
use billionaire_session::SessionError;
use billionaire_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `billionaire` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate. The
/// `#[from]` attribute on each variant generates the `From` impl, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum BillionaireError {
    /// A transport-level error (connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, bad attribute).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (closed, impossible transition).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A card-inventory error.
    #[error(transparent)]
    Card(#[from] CardError),

    /// An offer-book error.
    #[error(transparent)]
    Book(#[from] BookError),

    /// The configuration could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The connection task is gone; the request was not (or not
    /// completely) carried out.
    #[error("client disconnected")]
    Disconnected,
}
