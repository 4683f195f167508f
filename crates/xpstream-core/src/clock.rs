//! Time sources.
//!
//! Two independent clocks drive the core:
//!
//! - a **tick** counter (20 ticks per second on a healthy host) used for
//!   boost expiry, and
//! - the **wall clock** used for feedback cooldowns.
//!
//! They are never derived from each other inside the core. A [`Moment`]
//! carries one reading of each so an event is processed against a single
//! consistent instant.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Nominal tick length of the host.
pub const TICK_DURATION: Duration = Duration::from_millis(50);

/// One reading of both clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Moment {
    /// Host tick counter.
    pub tick: u64,
    /// Wall-clock time.
    pub wall: DateTime<Utc>,
}

impl Moment {
    /// Create a moment from explicit readings.
    pub const fn new(tick: u64, wall: DateTime<Utc>) -> Self {
        Self { tick, wall }
    }
}

/// A supplier of tick and wall-clock readings.
///
/// The tick reading must be monotonically non-decreasing.
pub trait TimeSource: Send + Sync {
    /// The current host tick.
    fn current_tick(&self) -> u64;

    /// The current wall-clock time.
    fn now(&self) -> DateTime<Utc>;

    /// Read both clocks.
    fn moment(&self) -> Moment {
        Moment::new(self.current_tick(), self.now())
    }
}

/// Time source for standalone hosts: ticks are derived from a monotonic
/// [`Instant`] at [`TICK_DURATION`] per tick, the wall clock is [`Utc::now`].
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    started: Instant,
}

impl SystemTimeSource {
    /// Start counting ticks from now.
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn current_tick(&self) -> u64 {
        let elapsed = self.started.elapsed().as_millis();
        let ticks = elapsed
            .checked_div(TICK_DURATION.as_millis())
            .unwrap_or(0);
        u64::try_from(ticks).unwrap_or(u64::MAX)
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven time source for tests and replay.
#[derive(Debug)]
pub struct ManualTimeSource {
    tick: AtomicU64,
    wall: RwLock<DateTime<Utc>>,
}

impl ManualTimeSource {
    /// Create a source frozen at `tick` and `wall`.
    pub const fn new(tick: u64, wall: DateTime<Utc>) -> Self {
        Self {
            tick: AtomicU64::new(tick),
            wall: RwLock::new(wall),
        }
    }

    /// Advance the tick counter by `ticks`.
    pub fn advance_ticks(&self, ticks: u64) {
        let _ = self
            .tick
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| {
                Some(t.saturating_add(ticks))
            });
    }

    /// Advance the wall clock by `by`.
    pub fn advance_wall(&self, by: Duration) {
        let delta = chrono::Duration::from_std(by).unwrap_or(chrono::Duration::MAX);
        let mut guard = match self.wall.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = guard.checked_add_signed(delta).unwrap_or(*guard);
    }
}

impl TimeSource for ManualTimeSource {
    fn current_tick(&self) -> u64 {
        self.tick.load(Ordering::Acquire)
    }

    fn now(&self) -> DateTime<Utc> {
        match self.wall.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clocks_advance_independently() {
        let start = Utc::now();
        let source = ManualTimeSource::new(100, start);

        source.advance_ticks(20);
        assert_eq!(source.current_tick(), 120);
        assert_eq!(source.now(), start);

        source.advance_wall(Duration::from_secs(3));
        assert_eq!(source.current_tick(), 120);
        assert_eq!(source.now(), start + chrono::Duration::seconds(3));
    }

    #[test]
    fn moment_reads_both_clocks() {
        let start = Utc::now();
        let source = ManualTimeSource::new(7, start);
        assert_eq!(source.moment(), Moment::new(7, start));
    }

    #[test]
    fn system_ticks_start_near_zero() {
        let source = SystemTimeSource::new();
        assert!(source.current_tick() < 20);
    }
}
