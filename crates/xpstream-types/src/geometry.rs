//! Positions and candidate recipients.

use serde::{Deserialize, Serialize};

use crate::ids::RecipientId;

/// A point in a world's 3D coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// East-west coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
    /// North-south coordinate.
    pub z: f64,
}

impl Position {
    /// Create a position from its three coordinates.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Squared Euclidean distance to `other`.
    ///
    /// No square root is taken; callers compare against a squared range.
    #[allow(clippy::arithmetic_side_effects)]
    pub fn distance_squared(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx.mul_add(dx, dy.mul_add(dy, dz * dz))
    }
}

/// How a candidate is currently participating in the world.
///
/// Only [`ObservationMode::Spectator`] excludes a candidate from receiving
/// rewards; the other modes are carried for the host's benefit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationMode {
    /// Normal play.
    #[default]
    Survival,
    /// Unrestricted building mode.
    Creative,
    /// Restricted interaction mode.
    Adventure,
    /// Observe-only mode. Never receives rewards.
    Spectator,
}

impl ObservationMode {
    /// Whether a candidate in this mode may receive rewards.
    pub const fn is_eligible(self) -> bool {
        !matches!(self, Self::Spectator)
    }
}

/// A potential recipient supplied by the host for one spawn event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Stable identity of the recipient.
    pub id: RecipientId,
    /// Display name, used only for diagnostics.
    #[serde(default)]
    pub name: String,
    /// Current position of the recipient.
    pub position: Position,
    /// Current observation mode.
    #[serde(default)]
    pub mode: ObservationMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_squared_skips_the_root() {
        let a = Position::new(0.0, 0.0, 0.0);
        let b = Position::new(2.0, 3.0, 6.0);
        assert!((a.distance_squared(&b) - 49.0).abs() < f64::EPSILON);
        assert!((b.distance_squared(&a) - 49.0).abs() < f64::EPSILON);
    }

    #[test]
    fn spectators_are_ineligible() {
        assert!(ObservationMode::Survival.is_eligible());
        assert!(ObservationMode::Creative.is_eligible());
        assert!(ObservationMode::Adventure.is_eligible());
        assert!(!ObservationMode::Spectator.is_eligible());
    }
}
