//! The client's picture of the game.

use std::collections::BTreeMap;

use billionaire_book::OfferBook;
use billionaire_cards::CardMultiset;
use billionaire_protocol::ParticipantId;
use billionaire_session::SessionState;
use serde::Serialize;

/// A snapshot of everything the client tracks.
///
/// The connection task owns the live copy and is the only writer; every
/// reader gets a clone through `tokio::sync::watch`, taken after a whole
/// frame has been applied. A `GameView` is therefore always internally
/// consistent, never half-way through a batch.
///
/// ## Hand and own offers
///
/// When the client sends NEW_OFFER the offered cards leave `hand` and
/// are parked in `own_offers` under the offer's size, matching what the
/// server does to its copy of the hand. They come back to `hand` (as
/// different cards) on SUCCESSFUL_TRADE, or unchanged on
/// CANCELLED_OFFER.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GameView {
    /// Session lifecycle state.
    pub state: SessionState,

    /// Our id, from JOIN.
    pub client_id: Option<ParticipantId>,

    /// Cards in hand, excluding cards on offer.
    pub hand: CardMultiset,

    /// Every open offer the client knows about, ours included.
    pub offers: OfferBook,

    /// Cards in our open offers, by offer size.
    pub own_offers: BTreeMap<u32, CardMultiset>,

    /// Our score, from the latest END_ROUND.
    pub score: Option<i64>,

    /// Who declared a billionaire hand this game, if anyone.
    pub billionaire: Option<ParticipantId>,
}

impl GameView {
    /// Returns `true` while a game is running.
    pub fn is_started(&self) -> bool {
        self.state.is_started()
    }

    /// Returns `true` if we have at least one open offer.
    pub fn has_open_offer(&self) -> bool {
        !self.own_offers.is_empty()
    }

    /// Returns `true` if the open offer of `size` is ours.
    pub fn is_own_offer(&self, size: u32) -> bool {
        match (&self.client_id, self.offers.owner_of(size)) {
            (Some(me), Some(owner)) => me == owner,
            _ => false,
        }
    }

    /// Hand plus cards on offer: what we would hold if every offer were
    /// withdrawn.
    pub fn holdings(&self) -> CardMultiset {
        let mut all = self.hand.clone();
        for cards in self.own_offers.values() {
            all.merge(cards);
        }
        all
    }

    /// Returns `true` if `id` is the declared billionaire.
    pub fn is_billionaire(&self, id: &ParticipantId) -> bool {
        self.billionaire.as_ref() == Some(id)
    }
}
