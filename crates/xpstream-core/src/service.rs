//! The long-lived reward service.
//!
//! [`RewardService`] owns every piece of shared state: the config cell, the
//! boost registry, the feedback throttle and the stats aggregator, plus the
//! time source both clocks are read from. Hosts hold it behind an [`Arc`]
//! and call into it from any number of threads.
//!
//! Each event reads the config cell once and processes against that single
//! snapshot, so a concurrent [`reload`](RewardService::reload) is observed
//! either wholly or not at all.

use std::sync::Arc;

use tracing::info;
use xpstream_types::{Candidate, Decision, RecipientId, SpawnEvent};

use crate::boost::{Boost, BoostError, BoostRegistry};
use crate::clock::{Moment, TimeSource};
use crate::config::{ConfigCell, ConfigSnapshot};
use crate::processor::EventProcessor;
use crate::stats::{RestoreReport, StatsAggregator, StatsSnapshot};
use crate::throttle::{COOLDOWN_RETENTION, EffectThrottle};

/// Shared state and entry points for reward processing.
pub struct RewardService {
    config: ConfigCell,
    boosts: BoostRegistry,
    throttle: EffectThrottle,
    stats: StatsAggregator,
    clock: Arc<dyn TimeSource>,
}

impl std::fmt::Debug for RewardService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RewardService")
            .field("config", &self.config)
            .field("boosts", &self.boosts.len())
            .field("throttle", &self.throttle.len())
            .field("stats", &self.stats.len())
            .finish_non_exhaustive()
    }
}

impl RewardService {
    /// Create a service with empty registries.
    pub fn new(config: ConfigSnapshot, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            config: ConfigCell::new(config),
            boosts: BoostRegistry::new(),
            throttle: EffectThrottle::new(),
            stats: StatsAggregator::new(),
            clock,
        }
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Process one spawn event at the current time.
    pub fn process(&self, event: &SpawnEvent, candidates: &[Candidate]) -> Decision {
        self.process_at(event, candidates, self.clock.moment())
    }

    /// Process one spawn event at an explicit moment.
    pub fn process_at(
        &self,
        event: &SpawnEvent,
        candidates: &[Candidate],
        now: Moment,
    ) -> Decision {
        let config = self.config.current();
        EventProcessor::new(&self.boosts, &self.throttle, &self.stats)
            .process(event, &config, candidates, now)
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    /// The snapshot new events will be processed against.
    pub fn config(&self) -> Arc<ConfigSnapshot> {
        self.config.current()
    }

    /// Swap in a new configuration. Events already in flight finish
    /// against the snapshot they started with.
    pub fn reload(&self, snapshot: ConfigSnapshot) {
        let previous = self.config.replace(snapshot);
        let current = self.config.current();
        info!(
            enabled = current.enabled(),
            range = current.range(),
            multiplier = current.multiplier(),
            previous_range = previous.range(),
            previous_multiplier = previous.multiplier(),
            "Configuration reloaded"
        );
    }

    /// The time source the service reads.
    pub fn clock(&self) -> &dyn TimeSource {
        self.clock.as_ref()
    }

    // -----------------------------------------------------------------------
    // Boosts
    // -----------------------------------------------------------------------

    /// Grant `multiplier` to `id` for `duration_ticks` from the current tick.
    pub fn grant_boost(
        &self,
        id: RecipientId,
        multiplier: f64,
        duration_ticks: i64,
    ) -> Result<Boost, BoostError> {
        self.boosts
            .grant(id, multiplier, duration_ticks, self.clock.current_tick())
    }

    /// Revoke the boost for `id`. Returns whether one was stored.
    pub fn clear_boost(&self, id: RecipientId) -> bool {
        self.boosts.clear(id)
    }

    /// The active boost for `id`, if any.
    pub fn boost_for(&self, id: RecipientId) -> Option<Boost> {
        self.boosts.active(id, self.clock.current_tick())
    }

    /// The multiplier in effect for `id` right now.
    pub fn effective_boost(&self, id: RecipientId) -> f64 {
        self.boosts
            .effective_multiplier(id, self.clock.current_tick())
    }

    // -----------------------------------------------------------------------
    // Stats
    // -----------------------------------------------------------------------

    /// Lifetime total for `id`.
    pub fn stat(&self, id: RecipientId) -> u64 {
        self.stats.get(id)
    }

    /// The `n` largest totals, descending.
    pub fn top(&self, n: usize) -> Vec<(RecipientId, u64)> {
        self.stats.top_n(n)
    }

    /// Forget the total for `id`.
    pub fn reset_stats(&self, id: RecipientId) -> Option<u64> {
        self.stats.reset(id)
    }

    /// Point-in-time copy of every total.
    pub fn snapshot_stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Bulk-load persisted totals keyed by recipient ID strings.
    pub fn restore_stats<I, K>(&self, raw: I) -> RestoreReport
    where
        I: IntoIterator<Item = (K, u64)>,
        K: AsRef<str>,
    {
        self.stats.restore(raw)
    }

    // -----------------------------------------------------------------------
    // Housekeeping
    // -----------------------------------------------------------------------

    /// Remove boosts expired at the current tick.
    pub fn sweep_expired_boosts(&self) -> usize {
        self.boosts.sweep_expired(self.clock.current_tick())
    }

    /// Drop cooldown records older than [`COOLDOWN_RETENTION`].
    pub fn purge_stale_cooldowns(&self) -> usize {
        self.throttle
            .purge_stale(self.clock.now(), COOLDOWN_RETENTION)
    }
}
