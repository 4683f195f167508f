//! Spawn events delivered by the host and the decisions returned to it.
//!
//! The core never grants rewards or renders effects itself. It answers
//! each [`SpawnEvent`] with a [`Decision`] that the host adapter executes.

use serde::{Deserialize, Serialize};

use crate::geometry::Position;
use crate::ids::RecipientId;

/// One observed reward spawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnEvent {
    /// Name of the world the reward spawned in.
    pub world: String,
    /// Where the reward spawned.
    pub location: Position,
    /// Reward amount before any multiplier is applied.
    pub raw_amount: u32,
}

/// Terminal state reached while processing one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The reward was assigned to a recipient.
    Granted,
    /// Processing is globally disabled.
    Disabled,
    /// The event's world is excluded by the world filter.
    WorldFiltered,
    /// No eligible candidate was within range.
    NoRecipient,
    /// The multiplied amount rounded to zero or below.
    ZeroAmount,
}

impl Outcome {
    /// Whether the event resulted in a grant.
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// A sound the host should play to the recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundCue {
    /// Host registry key of the sound.
    pub sound: String,
    /// Playback volume.
    pub volume: f32,
    /// Playback pitch.
    pub pitch: f32,
}

/// Particles the host should spawn at the reward location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticleCue {
    /// Host particle type name.
    pub particle: String,
    /// Number of particles to spawn.
    pub count: u32,
}

/// The core's answer to a [`SpawnEvent`].
///
/// `grant` and `recipient` are either both set (the event was granted) or
/// both unset (the event was rejected). The effect cues are only ever set
/// when `play_feedback` is true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Which terminal state processing reached.
    pub outcome: Outcome,
    /// The recipient that should receive the reward.
    pub recipient: Option<RecipientId>,
    /// The amount to grant after multipliers.
    pub grant: Option<u64>,
    /// Whether the feedback throttle permitted cosmetic effects.
    pub play_feedback: bool,
    /// Sound to play, when feedback is permitted and sound is enabled.
    pub sound: Option<SoundCue>,
    /// Particles to spawn, when feedback is permitted and particles are enabled.
    pub particles: Option<ParticleCue>,
}

impl Decision {
    /// A decision that performs nothing.
    pub const fn rejected(outcome: Outcome) -> Self {
        Self {
            outcome,
            recipient: None,
            grant: None,
            play_feedback: false,
            sound: None,
            particles: None,
        }
    }
}
