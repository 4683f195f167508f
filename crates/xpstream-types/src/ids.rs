//! Type-safe identifier for reward recipients.
//!
//! Recipients are identified by the host's stable UUID. The same identity
//! domain keys the boost, cooldown and stats registries, so a newtype keeps
//! arbitrary UUIDs (world IDs, entity IDs) from leaking into those maps.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a reward recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipientId(pub Uuid);

impl RecipientId {
    /// Create a new random identifier (UUID v4, matching host player IDs).
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Return the inner [`Uuid`] value.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for RecipientId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for RecipientId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecipientId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for RecipientId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<RecipientId> for Uuid {
    fn from(id: RecipientId) -> Self {
        id.0
    }
}
