//! Shared type definitions for xpstream.
//!
//! This crate holds the vocabulary shared by the aggregation core, the
//! persistence layer and the host adapter.
//!
//! # Modules
//!
//! - [`ids`] -- The [`RecipientId`] UUID wrapper
//! - [`geometry`] -- Positions and candidate recipients
//! - [`event`] -- Spawn events and the decisions returned for them

pub mod event;
pub mod geometry;
pub mod ids;

// Re-export all public types at crate root for convenience.
pub use event::{Decision, Outcome, ParticleCue, SoundCue, SpawnEvent};
pub use geometry::{Candidate, ObservationMode, Position};
pub use ids::RecipientId;
