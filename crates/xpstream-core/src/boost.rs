//! Temporary per-recipient reward multipliers.
//!
//! A boost is a multiplier with an absolute expiry tick. Expired boosts are
//! logically absent the moment `expires_at <= now`, whether or not they have
//! been physically removed yet. Removal happens lazily when a read finds an
//! expired entry, and in bulk from the maintenance sweep.
//!
//! Lazy removal is conditional on the entry still being expired, so a read
//! that races a fresh [`BoostRegistry::grant`] for the same recipient can
//! never delete the new boost.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;
use xpstream_types::RecipientId;

/// Multiplier applied when a recipient has no active boost.
pub const NO_BOOST: f64 = 1.0;

/// Errors returned when granting a boost.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BoostError {
    /// The multiplier is negative, NaN or infinite.
    #[error("boost multiplier must be a finite non-negative number, got {multiplier}")]
    InvalidMultiplier {
        /// The rejected multiplier.
        multiplier: f64,
    },
}

/// A stored boost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Boost {
    /// Multiplier applied on top of the global one.
    pub multiplier: f64,
    /// First tick at which the boost no longer applies.
    pub expires_at: u64,
}

impl Boost {
    /// Whether the boost still applies at `now`.
    pub const fn is_active(&self, now: u64) -> bool {
        self.expires_at > now
    }

    /// Ticks left before expiry at `now`.
    pub const fn remaining(&self, now: u64) -> u64 {
        self.expires_at.saturating_sub(now)
    }
}

/// Concurrent registry of per-recipient boosts.
#[derive(Debug, Default)]
pub struct BoostRegistry {
    boosts: DashMap<RecipientId, Boost>,
}

impl BoostRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `multiplier` to `id` for `duration` ticks starting at `now`,
    /// replacing any existing boost.
    ///
    /// A zero or negative duration stores an already-expired boost, which
    /// has no effect.
    pub fn grant(
        &self,
        id: RecipientId,
        multiplier: f64,
        duration: i64,
        now: u64,
    ) -> Result<Boost, BoostError> {
        if !multiplier.is_finite() || multiplier < 0.0 {
            return Err(BoostError::InvalidMultiplier { multiplier });
        }
        let boost = Boost {
            multiplier,
            expires_at: now.saturating_add_signed(duration),
        };
        self.boosts.insert(id, boost);
        debug!(recipient = %id, multiplier, expires_at = boost.expires_at, "Boost granted");
        Ok(boost)
    }

    /// The multiplier in effect for `id` at `now`.
    ///
    /// Returns [`NO_BOOST`] when the recipient has no boost or its boost has
    /// expired; an expired entry is removed on the way out.
    pub fn effective_multiplier(&self, id: RecipientId, now: u64) -> f64 {
        // Copy out so the shard read guard is released before any removal.
        let stored = self.boosts.get(&id).map(|entry| *entry);
        match stored {
            Some(boost) if boost.is_active(now) => boost.multiplier,
            Some(_) => {
                self.boosts.remove_if(&id, |_, boost| !boost.is_active(now));
                NO_BOOST
            }
            None => NO_BOOST,
        }
    }

    /// The active boost for `id` at `now`, if any. Does not remove expired
    /// entries.
    pub fn active(&self, id: RecipientId, now: u64) -> Option<Boost> {
        self.boosts
            .get(&id)
            .map(|entry| *entry)
            .filter(|boost| boost.is_active(now))
    }

    /// Revoke the boost for `id`. Returns whether an entry was removed.
    pub fn clear(&self, id: RecipientId) -> bool {
        self.boosts.remove(&id).is_some()
    }

    /// Remove every boost expired at `now`. Returns how many were removed.
    pub fn sweep_expired(&self, now: u64) -> usize {
        let mut removed: usize = 0;
        self.boosts.retain(|_, boost| {
            let keep = boost.is_active(now);
            if !keep {
                removed = removed.saturating_add(1);
            }
            keep
        });
        removed
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.boosts.len()
    }

    /// Whether no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.boosts.is_empty()
    }
}
