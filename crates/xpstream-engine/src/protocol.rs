//! JSON-lines wire protocol between the host and the engine.
//!
//! The host writes one [`HostMessage`] per line on stdin; the engine
//! answers with zero or more [`HostReply`] lines on stdout. Both are
//! internally tagged on `"type"`:
//!
//! ```json
//! {"type":"spawn","event":{"world":"world","location":{"x":0.5,"y":64.0,"z":0.5},"raw_amount":7},"candidates":[...]}
//! {"type":"decision","decision":{"outcome":"granted",...}}
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use xpstream_types::{Candidate, Decision, RecipientId, SpawnEvent};

/// A player as the host knows them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRef {
    /// Stable recipient ID.
    pub id: RecipientId,
    /// Display name.
    pub name: String,
}

/// Whoever issued a command.
///
/// A sender without an `id` is the console, which holds every permission
/// but has no stats of its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    /// The issuing player, or `None` for the console.
    #[serde(default)]
    pub id: Option<RecipientId>,
    /// Display name of the issuing player.
    #[serde(default)]
    pub name: Option<String>,
    /// Permission nodes granted to the sender.
    #[serde(default)]
    pub permissions: BTreeSet<String>,
}

impl Sender {
    /// The server console.
    #[cfg(test)]
    pub fn console() -> Self {
        Self::default()
    }

    /// A player holding `permissions`.
    #[cfg(test)]
    pub fn player<'a>(
        id: RecipientId,
        name: &str,
        permissions: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self {
            id: Some(id),
            name: Some(name.to_owned()),
            permissions: permissions.into_iter().map(str::to_owned).collect(),
        }
    }

    /// Whether this is the console.
    pub const fn is_console(&self) -> bool {
        self.id.is_none()
    }

    /// Whether the sender holds `permission`.
    pub fn has(&self, permission: &str) -> bool {
        self.is_console() || self.permissions.contains(permission)
    }
}

/// A message from the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    /// A reward spawned; decide who gets it.
    Spawn {
        /// The spawn itself.
        event: SpawnEvent,
        /// Players in the spawn's world.
        #[serde(default)]
        candidates: Vec<Candidate>,
    },
    /// The set of online players changed.
    Presence {
        /// Everyone currently online.
        players: Vec<PlayerRef>,
    },
    /// Run an `xpstats` command.
    Command {
        /// Who ran it.
        #[serde(default)]
        sender: Sender,
        /// Arguments after the command name.
        #[serde(default)]
        args: Vec<String>,
    },
    /// Tab-complete an `xpstats` command line.
    Complete {
        /// Who is typing.
        #[serde(default)]
        sender: Sender,
        /// Arguments typed so far; the last one is the partial word.
        #[serde(default)]
        args: Vec<String>,
    },
    /// Save stats and exit.
    Shutdown,
}

/// A message to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostReply {
    /// The decision for one spawn.
    Decision {
        /// What the host should do.
        decision: Decision,
    },
    /// Chat lines for a command sender.
    Messages {
        /// Recipient of the lines, or `None` for the console.
        recipient: Option<RecipientId>,
        /// Rendered lines, color codes already translated.
        lines: Vec<String>,
    },
    /// Tab-completion suggestions.
    Completions {
        /// Suggested words.
        options: Vec<String>,
    },
    /// A line the engine could not understand.
    Error {
        /// Description of the problem.
        message: String,
    },
}
