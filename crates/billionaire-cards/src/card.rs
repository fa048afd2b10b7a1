//! Card identifiers: the closed set of card kinds in a Billionaire deck.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::CardError;

/// A kind of card.
///
/// The discriminants are the wire encoding: the server sends and
/// expects plain integers (`{"id": 3, "amt": 2}` is two Property
/// cards), so they must never be renumbered.
///
/// The derived `Ord` follows declaration order, which is also the
/// discriminant order. [`CardMultiset`](crate::CardMultiset) relies on
/// this for its stable tie-break in `most_common`.
///
/// `#[serde(try_from = "i64", into = "i64")]` routes serde through the
/// integer conversions below, so a `CardId` appears in JSON as `3`,
/// not `"Property"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum CardId {
    /// No card selected. Never stored in a multiset.
    Invalid = -1,

    // -- Commodities --
    Diamonds = 0,
    Gold = 1,
    Oil = 2,
    Property = 3,
    Mining = 4,
    Shipping = 5,
    Banking = 6,
    Sport = 7,

    // -- Wildcards --
    Billionaire = 8,
    TaxCollector = 9,
}

impl CardId {
    /// Every storable card kind, in enumeration order.
    pub const ALL: [CardId; 10] = [
        CardId::Diamonds,
        CardId::Gold,
        CardId::Oil,
        CardId::Property,
        CardId::Mining,
        CardId::Shipping,
        CardId::Banking,
        CardId::Sport,
        CardId::Billionaire,
        CardId::TaxCollector,
    ];

    /// The eight commodity kinds.
    pub const COMMODITIES: [CardId; 8] = [
        CardId::Diamonds,
        CardId::Gold,
        CardId::Oil,
        CardId::Property,
        CardId::Mining,
        CardId::Shipping,
        CardId::Banking,
        CardId::Sport,
    ];

    /// The integer sent on the wire for this card.
    pub fn value(self) -> i64 {
        self as i64
    }

    /// Returns `true` for the eight commodity kinds.
    pub fn is_commodity(self) -> bool {
        matches!(self.value(), 0..=7)
    }

    /// Returns `true` for Billionaire and Tax Collector.
    ///
    /// Wildcards can ride along in a trade but cannot be offered alone.
    pub fn is_wildcard(self) -> bool {
        matches!(self, CardId::Billionaire | CardId::TaxCollector)
    }

    /// Returns `true` for every kind except the `Invalid` sentinel.
    pub fn is_valid(self) -> bool {
        self != CardId::Invalid
    }
}

impl TryFrom<i64> for CardId {
    type Error = CardError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(CardId::Invalid),
            0 => Ok(CardId::Diamonds),
            1 => Ok(CardId::Gold),
            2 => Ok(CardId::Oil),
            3 => Ok(CardId::Property),
            4 => Ok(CardId::Mining),
            5 => Ok(CardId::Shipping),
            6 => Ok(CardId::Banking),
            7 => Ok(CardId::Sport),
            8 => Ok(CardId::Billionaire),
            9 => Ok(CardId::TaxCollector),
            other => Err(CardError::UnknownCard(other)),
        }
    }
}

impl From<CardId> for i64 {
    fn from(card: CardId) -> Self {
        card.value()
    }
}

/// Title-cased names, as a feed or hand table would show them.
impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CardId::Invalid => "Invalid",
            CardId::Diamonds => "Diamonds",
            CardId::Gold => "Gold",
            CardId::Oil => "Oil",
            CardId::Property => "Property",
            CardId::Mining => "Mining",
            CardId::Shipping => "Shipping",
            CardId::Banking => "Banking",
            CardId::Sport => "Sport",
            CardId::Billionaire => "Billionaire",
            CardId::TaxCollector => "Tax Collector",
        };
        f.write_str(name)
    }
}
