//! Error types for the offer book.

use billionaire_protocol::ParticipantId;

/// Errors that can occur when changing the book.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookError {
    /// An offer of this size is already open.
    ///
    /// The book is keyed by size, so a second offer of the same size
    /// would silently evict the first. It is rejected instead and the
    /// book is left as it was.
    #[error("an offer of {size} cards is already open (owned by {owner})")]
    DuplicateOfferSize {
        /// The contested size.
        size: u32,
        /// Who holds it now.
        owner: ParticipantId,
    },

    /// An offer must contain at least one card.
    #[error("an offer must contain at least one card")]
    EmptyOffer,
}
