//! Background housekeeping.
//!
//! [`run_maintenance`] is a long-running task that periodically sweeps
//! expired boosts, purges stale cooldown records and, when stats are
//! enabled with a non-zero auto-save interval, hands a stats snapshot to a
//! [`StatsSink`]. It runs until the shutdown [`Notify`] fires, then performs
//! one final save.
//!
//! Intervals are re-read from the current config on every pass, so a
//! reload reschedules the loop without restarting it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::service::RewardService;
use crate::stats::StatsSnapshot;

/// How often expired boosts and stale cooldowns are swept.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Longest single wait between passes.
const MAX_WAIT: Duration = Duration::from_secs(31_536_000);

/// Errors reported by a [`StatsSink`].
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The sink could not persist the snapshot.
    #[error("stats sink failed: {message}")]
    Failed {
        /// Description of the failure.
        message: String,
    },
}

/// A destination for stats snapshots.
///
/// `save` is called from a blocking thread and may do synchronous I/O.
pub trait StatsSink: Send + Sync {
    /// Persist a complete snapshot, replacing whatever was saved before.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if the snapshot could not be written.
    fn save(&self, snapshot: &StatsSnapshot) -> Result<(), SinkError>;
}

/// Run housekeeping until `shutdown` is notified.
///
/// Stop the loop with [`Notify::notify_one`]; the permit is kept if the
/// loop is busy saving, so the request is never lost.
pub async fn run_maintenance(
    service: Arc<RewardService>,
    sink: Arc<dyn StatsSink>,
    shutdown: Arc<Notify>,
) {
    info!("Maintenance loop started");
    let mut last_save = Instant::now();
    let mut next_sweep = deadline(last_save, SWEEP_INTERVAL);

    loop {
        let save_every = auto_save_interval(&service);
        let save_due = if save_every.is_zero() {
            None
        } else {
            Some(deadline(last_save, save_every))
        };
        let wake = save_due.map_or(next_sweep, |due| due.min(next_sweep));

        tokio::select! {
            () = shutdown.notified() => break,
            () = tokio::time::sleep_until(wake) => {}
        }
        let now = Instant::now();

        // --- Sweep ---
        if now >= next_sweep {
            let boosts = service.sweep_expired_boosts();
            let cooldowns = service.purge_stale_cooldowns();
            if boosts > 0 || cooldowns > 0 {
                debug!(boosts, cooldowns, "Expired state swept");
            }
            next_sweep = deadline(now, SWEEP_INTERVAL);
        }

        // --- Auto-save ---
        if save_due.is_some_and(|due| now >= due) {
            let _ = save_snapshot(&service, &sink).await;
            last_save = now;
        }
    }

    if service.config().stats_enabled() {
        let _ = save_snapshot(&service, &sink).await;
    }
    info!("Maintenance loop stopped");
}

/// `from + every`, with `every` capped at [`MAX_WAIT`].
fn deadline(from: Instant, every: Duration) -> Instant {
    from.checked_add(every.min(MAX_WAIT)).unwrap_or(from)
}

/// Zero when auto-save is off, either explicitly or because stats are.
fn auto_save_interval(service: &RewardService) -> Duration {
    let config = service.config();
    if config.stats_enabled() {
        config.auto_save_interval()
    } else {
        Duration::ZERO
    }
}

/// Snapshot the totals and write them on a blocking thread.
///
/// Failures are logged and reported as `false`; the in-memory totals are
/// unaffected and the next save retries with fresh data.
pub async fn save_snapshot(service: &RewardService, sink: &Arc<dyn StatsSink>) -> bool {
    let snapshot = service.snapshot_stats();
    let entries = snapshot.len();
    let sink = Arc::clone(sink);

    match tokio::task::spawn_blocking(move || sink.save(&snapshot)).await {
        Ok(Ok(())) => {
            debug!(entries, "Stats saved");
            true
        }
        Ok(Err(e)) => {
            warn!(error = %e, entries, "Failed to save stats");
            false
        }
        Err(e) => {
            warn!(error = %e, "Stats save task did not complete");
            false
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Utc;
    use xpstream_types::{Candidate, ObservationMode, Position, RecipientId, SpawnEvent};

    use super::*;
    use crate::clock::ManualTimeSource;
    use crate::config::{ConfigSnapshot, Settings, StatsSettings};

    #[derive(Default)]
    struct RecordingSink {
        saved: Mutex<Vec<StatsSnapshot>>,
    }

    impl StatsSink for RecordingSink {
        fn save(&self, snapshot: &StatsSnapshot) -> Result<(), SinkError> {
            self.saved.lock().unwrap().push(snapshot.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FailingSink {
        attempts: AtomicUsize,
    }

    impl StatsSink for FailingSink {
        fn save(&self, _snapshot: &StatsSnapshot) -> Result<(), SinkError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(SinkError::Failed {
                message: String::from("disk full"),
            })
        }
    }

    fn service_with(stats: StatsSettings) -> Arc<RewardService> {
        let config = ConfigSnapshot::from_settings(&Settings {
            stats,
            ..Settings::default()
        });
        let clock = Arc::new(ManualTimeSource::new(0, Utc::now()));
        Arc::new(RewardService::new(config, clock))
    }

    fn grant(service: &RewardService, amount: u32) -> RecipientId {
        let player = Candidate {
            id: RecipientId::new(),
            name: String::from("sam"),
            position: Position::new(1.0, 0.0, 0.0),
            mode: ObservationMode::Survival,
        };
        let event = SpawnEvent {
            world: String::from("world"),
            location: Position::default(),
            raw_amount: amount,
        };
        let _ = service.process(&event, std::slice::from_ref(&player));
        player.id
    }

    #[tokio::test(start_paused = true)]
    async fn auto_saves_and_saves_again_on_shutdown() {
        let service = service_with(StatsSettings {
            auto_save_interval: 10,
            ..StatsSettings::default()
        });
        let id = grant(&service, 25);
        let sink = Arc::new(RecordingSink::default());
        let shutdown = Arc::new(Notify::new());

        let handle = tokio::spawn(run_maintenance(
            Arc::clone(&service),
            sink.clone(),
            Arc::clone(&shutdown),
        ));

        tokio::time::sleep(Duration::from_secs(11)).await;
        let autosaves = sink.saved.lock().unwrap().len();
        assert!(autosaves >= 1);

        let _ = grant(&service, 5);
        shutdown.notify_one();
        handle.await.unwrap();

        let saved = sink.saved.lock().unwrap();
        assert!(saved.len() > autosaves);
        assert_eq!(saved.last().and_then(|s| s.get(&id)), Some(&25));
        assert_eq!(saved.last().map(std::collections::BTreeMap::len), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn stats_disabled_never_saves() {
        let service = service_with(StatsSettings {
            enabled: false,
            ..StatsSettings::default()
        });
        let sink = Arc::new(RecordingSink::default());
        let shutdown = Arc::new(Notify::new());

        let handle = tokio::spawn(run_maintenance(
            Arc::clone(&service),
            sink.clone(),
            Arc::clone(&shutdown),
        ));
        tokio::time::sleep(Duration::from_secs(600)).await;
        shutdown.notify_one();
        handle.await.unwrap();

        assert!(sink.saved.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_saves_do_not_stop_the_loop() {
        let service = service_with(StatsSettings {
            auto_save_interval: 10,
            ..StatsSettings::default()
        });
        let sink = Arc::new(FailingSink::default());
        let shutdown = Arc::new(Notify::new());

        let handle = tokio::spawn(run_maintenance(
            Arc::clone(&service),
            sink.clone(),
            Arc::clone(&shutdown),
        ));
        tokio::time::sleep(Duration::from_secs(35)).await;
        shutdown.notify_one();
        handle.await.unwrap();

        assert!(sink.attempts.load(Ordering::SeqCst) >= 2);
        assert_eq!(service.snapshot_stats().len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn auto_save_follows_intervals_off_the_sweep_grid() {
        let service = service_with(StatsSettings {
            auto_save_interval: 90,
            ..StatsSettings::default()
        });
        let sink = Arc::new(RecordingSink::default());
        let shutdown = Arc::new(Notify::new());

        let handle = tokio::spawn(run_maintenance(
            Arc::clone(&service),
            sink.clone(),
            Arc::clone(&shutdown),
        ));

        // Saves are due at 90, 180, 270 and 360 seconds.
        tokio::time::sleep(Duration::from_secs(95)).await;
        assert_eq!(sink.saved.lock().unwrap().len(), 1);
        tokio::time::sleep(Duration::from_secs(270)).await;
        assert_eq!(sink.saved.lock().unwrap().len(), 4);

        shutdown.notify_one();
        handle.await.unwrap();
        assert_eq!(sink.saved.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn stop_requested_before_start_is_not_lost() {
        let service = service_with(StatsSettings::default());
        let sink = Arc::new(RecordingSink::default());
        let shutdown = Arc::new(Notify::new());
        shutdown.notify_one();

        run_maintenance(service, sink.clone(), shutdown).await;
        assert_eq!(sink.saved.lock().unwrap().len(), 1);
    }
}
