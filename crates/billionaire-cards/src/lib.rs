//! Cards for Billionaire.
//!
//! This crate is the leaf of the workspace. It knows nothing about
//! networking or commands, only about cards:
//!
//! - **Identifiers** ([`CardId`]): the closed set of card kinds and
//!   their stable integer encoding on the wire.
//! - **Multisets** ([`CardMultiset`]): a count-per-kind inventory, used
//!   for a hand, an offer, or the cards moved by a trade.
//! - **Errors** ([`CardError`]): contract violations when building or
//!   mutating a multiset.
//!
//! ```text
//! Protocol (attrs) → Cards (CardMultiset) → Client state (hand, escrow)
//! ```

mod card;
mod error;
mod multiset;

pub use card::CardId;
pub use error::CardError;
pub use multiset::{CardEntry, CardMultiset};
