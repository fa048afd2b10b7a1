//! The ordered set of commands carried by one frame.

use serde::{Deserialize, Serialize};

use crate::{Command, CommandKind};

/// The commands in one frame, in wire order, at most one per kind.
///
/// Order matters: the client dispatches commands in exactly this order.
/// Uniqueness is by kind (see [`Command`]'s equality): pushing a second
/// command of a kind already present **replaces** the first in place,
/// keeping its position. A batch therefore never holds two NEW_OFFERs.
///
/// Decoding applies the same rule, so a server batch that repeats a kind
/// keeps the position of the first and the attributes of the last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandBatch {
    commands: Vec<Command>,
}

/// `{"commands": [...]}`; the only shape a frame can take.
#[derive(Deserialize)]
struct WireBatch {
    commands: Vec<Command>,
}

impl CommandBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `command`, replacing any command of the same kind.
    ///
    /// Returns the replaced command, if there was one.
    pub fn push(&mut self, command: Command) -> Option<Command> {
        match self.commands.iter_mut().find(|c| **c == command) {
            Some(slot) => Some(std::mem::replace(slot, command)),
            None => {
                self.commands.push(command);
                None
            }
        }
    }

    /// Builder form of [`push`](Self::push).
    pub fn with(mut self, command: Command) -> Self {
        self.push(command);
        self
    }

    /// The command of `kind`, if present.
    pub fn get(&self, kind: CommandKind) -> Option<&Command> {
        self.commands.iter().find(|c| **c == kind)
    }

    /// Returns `true` if a command of `kind` is present.
    pub fn contains(&self, kind: CommandKind) -> bool {
        self.get(kind).is_some()
    }

    /// Number of commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` if there are no commands.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Commands in wire order.
    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.commands.iter()
    }
}

impl Serialize for CommandBatch {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct WireRef<'a> {
            commands: &'a [Command],
        }
        WireRef {
            commands: &self.commands,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CommandBatch {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = WireBatch::deserialize(deserializer)?;
        Ok(wire.commands.into_iter().collect())
    }
}

impl From<Command> for CommandBatch {
    fn from(command: Command) -> Self {
        Self {
            commands: vec![command],
        }
    }
}

impl From<Vec<Command>> for CommandBatch {
    fn from(commands: Vec<Command>) -> Self {
        commands.into_iter().collect()
    }
}

impl FromIterator<Command> for CommandBatch {
    fn from_iter<I: IntoIterator<Item = Command>>(iter: I) -> Self {
        let mut batch = CommandBatch::new();
        for command in iter {
            batch.push(command);
        }
        batch
    }
}

impl IntoIterator for CommandBatch {
    type Item = Command;
    type IntoIter = std::vec::IntoIter<Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.into_iter()
    }
}

impl<'a> IntoIterator for &'a CommandBatch {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}
