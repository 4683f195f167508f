//! Per-recipient gate for cosmetic feedback.
//!
//! Records the wall-clock time of each recipient's last permitted effect
//! and denies further effects until the cooldown has elapsed. The check and
//! the record happen under one entry lock, so two events for the same
//! recipient racing through the gate cannot both be let through.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use xpstream_types::RecipientId;

/// How long a cooldown record is kept before the periodic purge drops it.
pub const COOLDOWN_RETENTION: Duration = Duration::from_secs(60);

/// Concurrent map of last-feedback timestamps.
#[derive(Debug, Default)]
pub struct EffectThrottle {
    last_feedback: DashMap<RecipientId, DateTime<Utc>>,
}

impl EffectThrottle {
    /// Create an empty throttle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask permission to play feedback for `id` at `now`.
    ///
    /// A zero cooldown always permits and records nothing. Otherwise the
    /// first request, or one at least `cooldown` after the last permitted
    /// one, is permitted and recorded; anything sooner is denied and leaves
    /// the record untouched.
    pub fn try_consume(&self, id: RecipientId, cooldown: Duration, now: DateTime<Utc>) -> bool {
        if cooldown.is_zero() {
            return true;
        }
        let cooldown = TimeDelta::from_std(cooldown).unwrap_or(TimeDelta::MAX);

        match self.last_feedback.entry(id) {
            Entry::Occupied(mut entry) => {
                if now.signed_duration_since(*entry.get()) >= cooldown {
                    entry.insert(now);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        }
    }

    /// Drop records last refreshed more than `retention` before `now`.
    /// Returns how many were removed.
    pub fn purge_stale(&self, now: DateTime<Utc>, retention: Duration) -> usize {
        let retention = TimeDelta::from_std(retention).unwrap_or(TimeDelta::MAX);
        let Some(cutoff) = now.checked_sub_signed(retention) else {
            return 0;
        };

        let mut removed: usize = 0;
        self.last_feedback.retain(|_, last| {
            let keep = *last >= cutoff;
            if !keep {
                removed = removed.saturating_add(1);
            }
            keep
        });
        removed
    }

    /// Time of the last permitted feedback for `id`, if recorded.
    pub fn last_feedback(&self, id: RecipientId) -> Option<DateTime<Utc>> {
        self.last_feedback.get(&id).map(|entry| *entry)
    }

    /// Number of recipients with a record.
    pub fn len(&self) -> usize {
        self.last_feedback.len()
    }

    /// Whether no records are held.
    pub fn is_empty(&self) -> bool {
        self.last_feedback.is_empty()
    }
}
