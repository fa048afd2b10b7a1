//! Error types for the card layer.

use crate::CardId;

/// Errors that can occur when building or mutating card collections.
///
/// None of these come from the network directly. A malformed card list
/// in a server command surfaces as one of these only after the protocol
/// layer has already accepted the frame, so the client treats them as
/// recoverable: log, skip the mutation, keep reading.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CardError {
    /// `add` or `take` was called with an amount of zero.
    ///
    /// A zero amount is a caller bug, never a meaningful request.
    #[error("card amount must be greater than zero (card {0})")]
    ZeroAmount(CardId),

    /// The `Invalid` sentinel cannot be stored in a multiset.
    #[error("the invalid card sentinel cannot be stored")]
    InvalidCard,

    /// An integer on the wire does not name any card kind.
    #[error("unknown card id {0}")]
    UnknownCard(i64),
}
