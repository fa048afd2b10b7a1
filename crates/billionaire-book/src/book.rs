//! The book of open offers, keyed by offer size.

use std::collections::BTreeMap;
use std::fmt;

use billionaire_protocol::ParticipantId;
use serde::{Deserialize, Serialize};

use crate::BookError;

/// One open offer: `size` cards put up by `owner`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Offer {
    /// Number of cards on offer.
    pub size: u32,
    /// Who put it up.
    pub owner: ParticipantId,
}

impl fmt::Display for Offer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} cards from {}", self.size, self.owner)
    }
}

/// Open offers, keyed by size.
///
/// ## Identity
///
/// The server identifies an offer by its size alone: a BOOK_EVENT says
/// "an offer of 3 traded", not which one. So the book holds at most one
/// offer per size, and [`add_offer`](Self::add_offer) refuses a second
/// one rather than overwrite the first.
///
/// ## Ordering
///
/// A `BTreeMap` keeps [`iter`](Self::iter) in ascending size, which is
/// also how a book table reads naturally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfferBook {
    offers: BTreeMap<u32, ParticipantId>,
}

impl OfferBook {
    /// Creates an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an open offer of `size` cards from `owner`.
    ///
    /// # Errors
    /// - [`BookError::EmptyOffer`] if `size` is zero.
    /// - [`BookError::DuplicateOfferSize`] if that size is already
    ///   open. The book is unchanged.
    pub fn add_offer(&mut self, size: u32, owner: ParticipantId) -> Result<(), BookError> {
        if size == 0 {
            return Err(BookError::EmptyOffer);
        }
        if let Some(existing) = self.offers.get(&size) {
            return Err(BookError::DuplicateOfferSize {
                size,
                owner: existing.clone(),
            });
        }

        tracing::debug!(size, %owner, "offer opened");
        self.offers.insert(size, owner);
        Ok(())
    }

    /// Removes the offer of `size`, returning its owner.
    ///
    /// Removing a size that is not open is a no-op that returns `None`;
    /// the server may report an offer the client never saw open.
    pub fn remove_offer(&mut self, size: u32) -> Option<ParticipantId> {
        let owner = self.offers.remove(&size);
        if let Some(owner) = &owner {
            tracing::debug!(size, %owner, "offer closed");
        }
        owner
    }

    /// Who holds the open offer of `size`, if anyone.
    pub fn owner_of(&self, size: u32) -> Option<&ParticipantId> {
        self.offers.get(&size)
    }

    /// Returns `true` if an offer of `size` is open.
    pub fn contains(&self, size: u32) -> bool {
        self.offers.contains_key(&size)
    }

    /// Drops every offer.
    pub fn clear(&mut self) {
        self.offers.clear();
    }

    /// Number of open offers.
    pub fn len(&self) -> usize {
        self.offers.len()
    }

    /// Returns `true` if no offers are open.
    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }

    /// Open offers in ascending size.
    pub fn iter(&self) -> impl Iterator<Item = Offer> + '_ {
        self.offers.iter().map(|(&size, owner)| Offer {
            size,
            owner: owner.clone(),
        })
    }

    /// Sizes of the offers `owner` holds, ascending.
    pub fn offers_by<'a>(&'a self, owner: &'a ParticipantId) -> impl Iterator<Item = u32> + 'a {
        self.offers
            .iter()
            .filter(move |(_, o)| *o == owner)
            .map(|(&size, _)| size)
    }
}

/// Serialized as a list of [`Offer`]s so the JSON form is
/// `[{"size":3,"owner":"bob"}]` rather than a map with string keys.
impl Serialize for OfferBook {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for OfferBook {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let offers = Vec::<Offer>::deserialize(deserializer)?;
        let mut book = OfferBook::new();
        for offer in offers {
            book.add_offer(offer.size, offer.owner)
                .map_err(serde::de::Error::custom)?;
        }
        Ok(book)
    }
}
