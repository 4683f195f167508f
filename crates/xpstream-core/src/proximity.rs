//! Recipient selection by proximity.
//!
//! Given a spawn location and the host's candidate list, pick the single
//! nearest eligible candidate within range. Spectators are skipped before
//! any distance is computed. Distances are compared squared.
//!
//! On an exact distance tie the candidate seen first in iteration order
//! wins. That depends on the host's enumeration order and is therefore not
//! a stable ordering across hosts; it is kept as-is so replays against the
//! same candidate list are reproducible.

use xpstream_types::{Candidate, Position};

/// Select the nearest eligible candidate strictly within
/// `max_range_squared` of `location`.
///
/// Returns `None` when the candidate set is empty or nobody eligible is in
/// range.
pub fn select<'a, I>(location: &Position, candidates: I, max_range_squared: f64) -> Option<&'a Candidate>
where
    I: IntoIterator<Item = &'a Candidate>,
{
    let mut best: Option<&'a Candidate> = None;
    let mut best_distance = max_range_squared;

    for candidate in candidates {
        if !candidate.mode.is_eligible() {
            continue;
        }
        let distance = candidate.position.distance_squared(location);
        if distance < best_distance {
            best_distance = distance;
            best = Some(candidate);
        }
    }

    best
}
