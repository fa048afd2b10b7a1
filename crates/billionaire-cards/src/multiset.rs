//! A count-per-kind card inventory.
//!
//! A [`CardMultiset`] is how the client represents any pile of cards:
//! the player's hand, the cards in an open offer, the cards received in
//! a trade. The server never sends individual cards, only `(id, amt)`
//! pairs, so a multiset is the natural shape.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{CardError, CardId};

/// One `(id, amount)` pair as it appears on the wire.
///
/// ```json
/// {"id": 0, "amt": 5, "val": 10}
/// ```
///
/// The server attaches the card's point value as `val`. The client
/// keeps it when present so a decoded entry can be re-encoded
/// unchanged, but a multiset does not store it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardEntry {
    /// Which card.
    pub id: CardId,
    /// How many of it. Zero is tolerated on input and skipped.
    pub amt: u32,
    /// Point value, if the sender included one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub val: Option<i64>,
}

/// A multiset of cards: `CardId → count`, with no zero counts.
///
/// ## Invariant
///
/// A key is present if and only if its count is greater than zero.
/// Every mutating method restores this before returning, so
/// [`len`](Self::len) is always the number of distinct kinds held.
///
/// ## Take policy
///
/// [`take`](Self::take) clamps: asking for more cards than are present
/// removes what is there and reports exactly that in the returned
/// multiset. It never fails for an over-request.
///
/// The map is a `BTreeMap` so iteration (and the JSON form) follows
/// [`CardId`] enumeration order.
///
/// `#[serde(try_from, into)]` gives the wire form: a JSON array of
/// [`CardEntry`] objects, validated on the way in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CardEntry>", into = "Vec<CardEntry>")]
pub struct CardMultiset {
    cards: BTreeMap<CardId, u32>,
}

impl CardMultiset {
    /// Creates an empty multiset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many cards of kind `card` are held (0 if none).
    pub fn amount(&self, card: CardId) -> u32 {
        self.cards.get(&card).copied().unwrap_or(0)
    }

    /// Returns `true` if at least one card of kind `card` is held.
    pub fn contains(&self, card: CardId) -> bool {
        self.cards.contains_key(&card)
    }

    /// Adds `amount` cards of kind `card`.
    ///
    /// # Errors
    /// - [`CardError::ZeroAmount`] if `amount` is 0.
    /// - [`CardError::InvalidCard`] if `card` is the `Invalid` sentinel.
    pub fn add(&mut self, card: CardId, amount: u32) -> Result<(), CardError> {
        if amount == 0 {
            return Err(CardError::ZeroAmount(card));
        }
        if !card.is_valid() {
            return Err(CardError::InvalidCard);
        }
        let count = self.cards.entry(card).or_insert(0);
        *count = count.saturating_add(amount);
        Ok(())
    }

    /// Removes up to `amount` cards of kind `card` and returns what was
    /// actually removed.
    ///
    /// The removed amount is `min(amount, self.amount(card))`; the
    /// result is empty when nothing of that kind is held.
    ///
    /// # Errors
    /// Returns [`CardError::ZeroAmount`] if `amount` is 0.
    pub fn take(&mut self, card: CardId, amount: u32) -> Result<CardMultiset, CardError> {
        if amount == 0 {
            return Err(CardError::ZeroAmount(card));
        }

        let mut taken = CardMultiset::new();
        if let Some(count) = self.cards.get_mut(&card) {
            let removed = amount.min(*count);
            *count -= removed;
            if *count == 0 {
                self.cards.remove(&card);
            }
            taken.cards.insert(card, removed);
        }
        Ok(taken)
    }

    /// Removes every card in `other` from `self`, clamping per kind.
    ///
    /// Returns the cards actually removed.
    pub fn take_all(&mut self, other: &CardMultiset) -> CardMultiset {
        let mut taken = CardMultiset::new();
        for (card, amount) in other.iter() {
            // `other` upholds the invariant, so `amount` is never zero.
            if let Ok(part) = self.take(card, amount) {
                taken.merge(&part);
            }
        }
        taken
    }

    /// Adds every card in `other` to `self`.
    pub fn merge(&mut self, other: &CardMultiset) {
        for (card, amount) in other.iter() {
            let count = self.cards.entry(card).or_insert(0);
            *count = count.saturating_add(amount);
        }
    }

    /// Returns up to `k` `(card, count)` pairs, largest count first.
    ///
    /// Equal counts keep [`CardId`] enumeration order: the map already
    /// iterates in that order and `sort_by` is stable.
    pub fn most_common(&self, k: usize) -> Vec<(CardId, u32)> {
        let mut pairs: Vec<(CardId, u32)> = self.iter().collect();
        pairs.sort_by(|a, b| b.1.cmp(&a.1));
        pairs.truncate(k);
        pairs
    }

    /// Total number of cards across all kinds, saturating at `u32::MAX`.
    pub fn total(&self) -> u32 {
        self.cards.values().fold(0, |sum, count| sum.saturating_add(*count))
    }

    /// Number of distinct kinds held.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Returns `true` if no cards are held.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Iterates `(card, count)` pairs in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = (CardId, u32)> + '_ {
        self.cards.iter().map(|(card, count)| (*card, *count))
    }

    /// Removes every card.
    pub fn clear(&mut self) {
        self.cards.clear();
    }

    /// The wire form: one [`CardEntry`] per held kind, without values.
    pub fn to_entries(&self) -> Vec<CardEntry> {
        self.iter()
            .map(|(id, amt)| CardEntry { id, amt, val: None })
            .collect()
    }
}

impl TryFrom<Vec<CardEntry>> for CardMultiset {
    type Error = CardError;

    /// Builds a multiset from wire entries.
    ///
    /// Entries with `amt == 0` are skipped. Repeated ids accumulate.
    fn try_from(entries: Vec<CardEntry>) -> Result<Self, Self::Error> {
        let mut cards = CardMultiset::new();
        for entry in entries {
            if entry.amt == 0 {
                continue;
            }
            cards.add(entry.id, entry.amt)?;
        }
        Ok(cards)
    }
}

impl From<CardMultiset> for Vec<CardEntry> {
    fn from(cards: CardMultiset) -> Self {
        cards.to_entries()
    }
}

impl FromIterator<(CardId, u32)> for CardMultiset {
    /// Collects pairs, silently dropping zero amounts and `Invalid`.
    fn from_iter<I: IntoIterator<Item = (CardId, u32)>>(iter: I) -> Self {
        let mut cards = CardMultiset::new();
        for (card, amount) in iter {
            let _ = cards.add(card, amount);
        }
        cards
    }
}

/// `Diamonds: 5, Gold: 2`, in enumeration order.
impl fmt::Display for CardMultiset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (card, count) in self.iter() {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{card}: {count}")?;
            first = false;
        }
        Ok(())
    }
}
