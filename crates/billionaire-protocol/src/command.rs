//! Commands: the unit of conversation between client and server.
//!
//! A command is a kind from a fixed vocabulary plus an open bag of
//! attributes. The vocabulary is closed (an unknown name is an error),
//! the attributes are not: each kind carries whatever fields it needs,
//! and the client reads them through explicit accessors.

use std::fmt;
use std::str::FromStr;

use billionaire_cards::CardMultiset;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{ParticipantId, ProtocolError};

/// Returned by [`Command::attr`] for a missing key.
static NULL: Value = Value::Null;

// ---------------------------------------------------------------------------
// CommandKind
// ---------------------------------------------------------------------------

/// The fixed command vocabulary.
///
/// Some kinds only flow server → client (JOIN, START, BOOK_EVENT, ...),
/// some only client → server (NEW_OFFER, CANCEL_OFFER), and a few are
/// kept from earlier revisions of the protocol (ASK, CANCEL, RECEIVE,
/// CHECK, BOOK_STATE, FINISH) so an older server still decodes cleanly.
///
/// `#[serde(rename_all = "SCREAMING_SNAKE_CASE")]` makes the serde form
/// match the wire exactly: `NewOffer` ↔ `"NEW_OFFER"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandKind {
    // -- Session lifecycle --
    /// Server → client: you are in, here is your `client_id`.
    Join,
    /// Server → client: the game is on, here is your `hand`.
    Start,
    /// Server → client: the game is over (older servers).
    Finish,
    /// Server → client: the game is over.
    EndGame,
    /// Server → client: a round ended, here is your `score`.
    EndRound,

    // -- Trading, client → server --
    /// Legacy offer.
    Ask,
    /// Put `cards` up for trade.
    NewOffer,
    /// Legacy cancel.
    Cancel,
    /// Withdraw the open offer of size `card_amt`.
    CancelOffer,

    // -- Trading, server → client --
    /// Legacy: cards received.
    Receive,
    /// Legacy: state check.
    Check,
    /// Legacy: full book snapshot.
    BookState,
    /// Something happened to the book between other players.
    BookEvent,
    /// Your offer traded; `cards` are what you received.
    SuccessfulTrade,
    /// Your offer was withdrawn or refused; `cards` come back.
    CancelledOffer,
    /// Someone has declared a billionaire hand.
    Billionaire,
    /// The server rejected something you sent.
    Error,
}

impl CommandKind {
    /// Every kind, in declaration order.
    pub const ALL: [CommandKind; 17] = [
        CommandKind::Join,
        CommandKind::Start,
        CommandKind::Finish,
        CommandKind::EndGame,
        CommandKind::EndRound,
        CommandKind::Ask,
        CommandKind::NewOffer,
        CommandKind::Cancel,
        CommandKind::CancelOffer,
        CommandKind::Receive,
        CommandKind::Check,
        CommandKind::BookState,
        CommandKind::BookEvent,
        CommandKind::SuccessfulTrade,
        CommandKind::CancelledOffer,
        CommandKind::Billionaire,
        CommandKind::Error,
    ];

    /// The wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::Join => "JOIN",
            CommandKind::Start => "START",
            CommandKind::Finish => "FINISH",
            CommandKind::EndGame => "END_GAME",
            CommandKind::EndRound => "END_ROUND",
            CommandKind::Ask => "ASK",
            CommandKind::NewOffer => "NEW_OFFER",
            CommandKind::Cancel => "CANCEL",
            CommandKind::CancelOffer => "CANCEL_OFFER",
            CommandKind::Receive => "RECEIVE",
            CommandKind::Check => "CHECK",
            CommandKind::BookState => "BOOK_STATE",
            CommandKind::BookEvent => "BOOK_EVENT",
            CommandKind::SuccessfulTrade => "SUCCESSFUL_TRADE",
            CommandKind::CancelledOffer => "CANCELLED_OFFER",
            CommandKind::Billionaire => "BILLIONAIRE",
            CommandKind::Error => "ERROR",
        }
    }

    /// FINISH and END_GAME are two names for the same event.
    pub fn is_finish(self) -> bool {
        matches!(self, CommandKind::Finish | CommandKind::EndGame)
    }
}

impl FromStr for CommandKind {
    type Err = ProtocolError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        CommandKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| ProtocolError::InvalidCommandKind(name.to_string()))
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// One command: a [`CommandKind`] plus open JSON attributes.
///
/// On the wire a command is a flat object whose `command` field is the
/// kind and whose other fields are the attributes:
///
/// ```text
/// {"command":"BOOK_EVENT","card_amt":3,"event":"NEW_OFFER","participants":["bob"]}
/// ```
///
/// ## Equality
///
/// `==` compares **only the kind**. Two NEW_OFFERs with different cards
/// are equal, and a command is equal to its bare kind
/// (`cmd == CommandKind::Join`). This is what membership tests against
/// a batch want. Use [`same_as`](Self::same_as) to compare attributes too.
///
/// ## Attributes
///
/// There is no "any unknown field is None" magic. [`attr`](Self::attr)
/// returns `&Value::Null` for a missing key, and the typed readers
/// return `Option` or `Result`, so a typo shows up as a missing value
/// rather than silently flowing through.
///
/// The `command` key is reserved for the kind and is never stored as an
/// attribute.
#[derive(Debug, Clone)]
pub struct Command {
    kind: CommandKind,
    attrs: Map<String, Value>,
}

impl Command {
    /// Creates a command with no attributes.
    pub fn new(kind: CommandKind) -> Self {
        Self {
            kind,
            attrs: Map::new(),
        }
    }

    /// Creates a command from its wire name.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidCommandKind`] if `name` is not in
    /// the vocabulary.
    pub fn named(name: &str) -> Result<Self, ProtocolError> {
        Ok(Self::new(name.parse()?))
    }

    /// Builds a command from a decoded JSON object.
    ///
    /// # Errors
    /// - [`ProtocolError::MalformedPayload`] if there is no `command`
    ///   string field.
    /// - [`ProtocolError::InvalidCommandKind`] if the name is unknown.
    pub fn from_map(mut map: Map<String, Value>) -> Result<Self, ProtocolError> {
        let kind = match map.remove("command") {
            Some(Value::String(name)) => name.parse()?,
            Some(other) => {
                return Err(ProtocolError::MalformedPayload(format!(
                    "`command` must be a string, got {other}"
                )));
            }
            None => {
                return Err(ProtocolError::MalformedPayload(
                    "missing `command` field".into(),
                ));
            }
        };
        Ok(Self { kind, attrs: map })
    }

    /// A NEW_OFFER putting `cards` up for trade.
    pub fn new_offer(cards: &CardMultiset) -> Self {
        let entries: Vec<Value> = cards
            .to_entries()
            .into_iter()
            .map(|entry| serde_json::json!({"id": entry.id.value(), "amt": entry.amt}))
            .collect();
        Self::new(CommandKind::NewOffer).with_attr("cards", entries)
    }

    /// A CANCEL_OFFER withdrawing the open offer of `size` cards.
    pub fn cancel_offer(size: u32) -> Self {
        Self::new(CommandKind::CancelOffer).with_attr("card_amt", size)
    }

    /// Returns this command with `key` set to `value`.
    ///
    /// Setting `command` is ignored; the kind is fixed at construction.
    pub fn with_attr(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Sets `key` to `value`, returning the previous value.
    pub fn set_attr(&mut self, key: &str, value: impl Into<Value>) -> Option<Value> {
        if key == "command" {
            return None;
        }
        self.attrs.insert(key.to_string(), value.into())
    }

    /// The command's kind.
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// All attributes, excluding `command`.
    pub fn attrs(&self) -> &Map<String, Value> {
        &self.attrs
    }

    /// Returns `true` if kind and attributes both match.
    pub fn same_as(&self, other: &Command) -> bool {
        self.kind == other.kind && self.attrs == other.attrs
    }

    /// Returns the attribute for `key`, or `&Value::Null` if absent.
    pub fn attr(&self, key: &str) -> &Value {
        self.attrs.get(key).unwrap_or(&NULL)
    }

    /// Returns `true` if `key` is present (even if its value is null).
    pub fn has_attr(&self, key: &str) -> bool {
        self.attrs.contains_key(key)
    }

    /// The attribute as a string, if it is one.
    pub fn str_attr(&self, key: &str) -> Option<&str> {
        self.attr(key).as_str()
    }

    /// The attribute as a non-negative integer, if it is one.
    pub fn u64_attr(&self, key: &str) -> Option<u64> {
        self.attr(key).as_u64()
    }

    /// The attribute as a signed integer, if it is one.
    pub fn i64_attr(&self, key: &str) -> Option<i64> {
        self.attr(key).as_i64()
    }

    /// Deserializes the attribute into `T`.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidAttr`] if the key is missing or
    /// the value does not fit `T`.
    pub fn parse_attr<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<T, ProtocolError> {
        let value = self.attrs.get(key).ok_or_else(|| ProtocolError::InvalidAttr {
            key: key.to_string(),
            reason: "missing".into(),
        })?;
        T::deserialize(value).map_err(|e| ProtocolError::InvalidAttr {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    /// Reads a card list attribute (`hand`, `cards`).
    pub fn cards_attr(&self, key: &str) -> Result<CardMultiset, ProtocolError> {
        self.parse_attr(key)
    }

    /// Reads the `participants` attribute of a BOOK_EVENT.
    pub fn participants(&self) -> Result<Vec<ParticipantId>, ProtocolError> {
        self.parse_attr("participants")
    }
}

impl PartialEq for Command {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for Command {}

impl PartialEq<CommandKind> for Command {
    fn eq(&self, other: &CommandKind) -> bool {
        self.kind == *other
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.attrs.is_empty() {
            write!(f, " {}", Value::Object(self.attrs.clone()))?;
        }
        Ok(())
    }
}

/// Flat object, `command` first.
impl Serialize for Command {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.attrs.len() + 1))?;
        map.serialize_entry("command", self.kind.as_str())?;
        for (key, value) in &self.attrs {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Command {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        Command::from_map(map).map_err(de::Error::custom)
    }
}
