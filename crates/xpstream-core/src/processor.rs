//! Per-event orchestration.
//!
//! One call to [`EventProcessor::process`] takes a spawn event through
//!
//! ```text
//! Received -> Filtered -> ResolvedRecipient -> AmountComputed
//!          -> Applied -> FeedbackDecided -> Done
//! ```
//!
//! Any rejection jumps straight to `Done` before a single registry has been
//! touched. The processor never grants rewards or renders effects; it
//! returns a [`Decision`] for the host to carry out.

use tracing::info;
use xpstream_types::{Candidate, Decision, Outcome, ParticleCue, SoundCue, SpawnEvent};

use crate::boost::BoostRegistry;
use crate::clock::Moment;
use crate::config::ConfigSnapshot;
use crate::proximity;
use crate::stats::StatsAggregator;
use crate::throttle::EffectThrottle;

/// Borrowed view of the registries one event needs.
#[derive(Debug, Clone, Copy)]
pub struct EventProcessor<'a> {
    boosts: &'a BoostRegistry,
    throttle: &'a EffectThrottle,
    stats: &'a StatsAggregator,
}

impl<'a> EventProcessor<'a> {
    /// Create a processor over the given registries.
    pub const fn new(
        boosts: &'a BoostRegistry,
        throttle: &'a EffectThrottle,
        stats: &'a StatsAggregator,
    ) -> Self {
        Self {
            boosts,
            throttle,
            stats,
        }
    }

    /// Process one spawn event against `config` at `now`.
    pub fn process(
        &self,
        event: &SpawnEvent,
        config: &ConfigSnapshot,
        candidates: &[Candidate],
        now: Moment,
    ) -> Decision {
        // --- Filtered ---
        if !config.enabled() {
            return Decision::rejected(Outcome::Disabled);
        }
        if !config.is_world_allowed(&event.world) {
            return Decision::rejected(Outcome::WorldFiltered);
        }

        // --- ResolvedRecipient ---
        let Some(recipient) =
            proximity::select(&event.location, candidates, config.range_squared())
        else {
            return Decision::rejected(Outcome::NoRecipient);
        };

        // --- AmountComputed ---
        let boost = self.boosts.effective_multiplier(recipient.id, now.tick);
        let Some(amount) = scaled_amount(event.raw_amount, config.multiplier() * boost) else {
            return Decision::rejected(Outcome::ZeroAmount);
        };

        // --- Applied ---
        if config.stats_enabled() {
            let _ = self.stats.add(recipient.id, amount);
        }

        // --- FeedbackDecided ---
        let play_feedback =
            self.throttle
                .try_consume(recipient.id, config.effect_cooldown(), now.wall);
        let sound = config
            .sound()
            .filter(|_| play_feedback)
            .map(|s| SoundCue {
                sound: s.sound.clone(),
                volume: s.volume,
                pitch: s.pitch,
            });
        let particles = config
            .particles()
            .filter(|_| play_feedback)
            .map(|p| ParticleCue {
                particle: p.particle.clone(),
                count: p.count,
            });

        if config.debug() {
            info!(
                recipient = %recipient.id,
                name = recipient.name.as_str(),
                amount,
                raw = event.raw_amount,
                world = event.world.as_str(),
                x = event.location.x,
                y = event.location.y,
                z = event.location.z,
                "Reward granted"
            );
        }

        Decision {
            outcome: Outcome::Granted,
            recipient: Some(recipient.id),
            grant: Some(amount),
            play_feedback,
            sound,
            particles,
        }
    }
}

/// `round(raw * multiplier)`, or `None` when that is not a positive amount.
///
/// Products too large for `u64`, including ones that overflow to infinity,
/// saturate at `u64::MAX`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scaled_amount(raw: u32, multiplier: f64) -> Option<u64> {
    let rounded = (f64::from(raw) * multiplier).round();
    // NaN fails the comparison; float-to-int `as` saturates.
    if rounded > 0.0 {
        Some(rounded as u64)
    } else {
        None
    }
}
