//! The open-offer book.
//!
//! Every player can see every open offer, but only by size: an offer is
//! "somebody wants to trade N cards". [`OfferBook`] is the client's
//! replica of that table, kept in sync by BOOK_EVENT, SUCCESSFUL_TRADE,
//! CANCELLED_OFFER and the client's own NEW_OFFER writes.

mod book;
mod error;

pub use book::{Offer, OfferBook};
pub use error::BookError;
