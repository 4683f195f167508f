//! Lifetime reward totals per recipient.
//!
//! [`StatsAggregator`] is the system of record for totals. Every write is
//! atomic at the level of one recipient: [`add`](StatsAggregator::add)
//! increments under the entry lock, so concurrent adds never lose updates
//! and the final total is the exact sum regardless of interleaving.
//!
//! Absence means zero. A reset removes the key rather than storing zero.
//!
//! Multi-key reads (persistence, leaderboards) go through
//! [`snapshot`](StatsAggregator::snapshot), an owned point-in-time copy that
//! later writes cannot touch.

use std::collections::BTreeMap;

use dashmap::DashMap;
use tracing::{info, warn};
use xpstream_types::RecipientId;

/// Point-in-time copy of every total.
pub type StatsSnapshot = BTreeMap<RecipientId, u64>;

/// Outcome of a bulk [`restore`](StatsAggregator::restore).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Entries loaded.
    pub loaded: usize,
    /// Keys that could not be parsed as recipient IDs.
    pub skipped: Vec<String>,
}

/// Concurrent map of per-recipient totals.
#[derive(Debug, Default)]
pub struct StatsAggregator {
    totals: DashMap<RecipientId, u64>,
}

impl StatsAggregator {
    /// Create an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to the total for `id` and return the new total.
    ///
    /// Amounts are unsigned, so a negative increment cannot be expressed. A
    /// zero increment changes nothing and never creates an entry. The total
    /// saturates at `u64::MAX`.
    pub fn add(&self, id: RecipientId, amount: u64) -> u64 {
        if amount == 0 {
            return self.get(id);
        }
        let total = self
            .totals
            .entry(id)
            .and_modify(|total| *total = total.saturating_add(amount))
            .or_insert(amount);
        *total
    }

    /// Total for `id`; zero when nothing has been recorded.
    pub fn get(&self, id: RecipientId) -> u64 {
        self.totals.get(&id).map_or(0, |total| *total)
    }

    /// Forget everything recorded for `id`. Returns the removed total.
    pub fn reset(&self, id: RecipientId) -> Option<u64> {
        self.totals.remove(&id).map(|(_, total)| total)
    }

    /// Owned copy of every total.
    ///
    /// Each entry is read atomically; entries written while the copy is
    /// being taken may or may not be included, but nothing written after
    /// this returns can change it.
    pub fn snapshot(&self) -> StatsSnapshot {
        self.totals
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect()
    }

    /// The `n` largest totals, descending.
    ///
    /// Computed from a snapshot. Order among exactly equal totals is
    /// unspecified.
    pub fn top_n(&self, n: usize) -> Vec<(RecipientId, u64)> {
        let mut ranked: Vec<(RecipientId, u64)> = self.snapshot().into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(n);
        ranked
    }

    /// Bulk-load persisted totals.
    ///
    /// Keys that are not valid recipient IDs are skipped and reported;
    /// the rest of the load continues. Loaded totals replace any existing
    /// value for the same recipient.
    pub fn restore<I, K>(&self, raw: I) -> RestoreReport
    where
        I: IntoIterator<Item = (K, u64)>,
        K: AsRef<str>,
    {
        let mut report = RestoreReport::default();
        for (key, total) in raw {
            let key = key.as_ref();
            match key.parse::<RecipientId>() {
                Ok(id) => {
                    self.totals.insert(id, total);
                    report.loaded = report.loaded.saturating_add(1);
                }
                Err(e) => {
                    warn!(key, error = %e, "Skipping invalid recipient ID in stored stats");
                    report.skipped.push(key.to_owned());
                }
            }
        }
        info!(
            loaded = report.loaded,
            skipped = report.skipped.len(),
            "Stats restored"
        );
        report
    }

    /// Number of recipients with a recorded total.
    pub fn len(&self) -> usize {
        self.totals.len()
    }

    /// Whether no totals are recorded.
    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn absent_recipient_is_zero() {
        let stats = StatsAggregator::new();
        assert_eq!(stats.get(RecipientId::new()), 0);
        assert!(stats.is_empty());
    }

    #[test]
    fn add_accumulates_and_returns_total() {
        let stats = StatsAggregator::new();
        let id = RecipientId::new();
        assert_eq!(stats.add(id, 5), 5);
        assert_eq!(stats.add(id, 7), 12);
        assert_eq!(stats.get(id), 12);
    }

    #[test]
    fn zero_increment_stores_nothing() {
        let stats = StatsAggregator::new();
        let id = RecipientId::new();
        assert_eq!(stats.add(id, 0), 0);
        assert!(stats.is_empty());

        let _ = stats.add(id, 4);
        assert_eq!(stats.add(id, 0), 4);
    }

    #[test]
    fn add_saturates() {
        let stats = StatsAggregator::new();
        let id = RecipientId::new();
        let _ = stats.add(id, u64::MAX - 1);
        assert_eq!(stats.add(id, 10), u64::MAX);
    }

    #[test]
    fn reset_clears_history() {
        let stats = StatsAggregator::new();
        let id = RecipientId::new();
        let _ = stats.add(id, 40);

        assert_eq!(stats.reset(id), Some(40));
        assert_eq!(stats.get(id), 0);
        assert!(stats.is_empty());

        assert_eq!(stats.add(id, 7), 7);
        assert_eq!(stats.get(id), 7);
    }

    #[test]
    fn top_n_is_descending_and_bounded() {
        let stats = StatsAggregator::new();
        let a = RecipientId::new();
        let b = RecipientId::new();
        let c = RecipientId::new();
        let d = RecipientId::new();
        let _ = stats.add(a, 50);
        let _ = stats.add(b, 30);
        let _ = stats.add(c, 10);
        let _ = stats.add(d, 5);

        assert_eq!(stats.top_n(3), vec![(a, 50), (b, 30), (c, 10)]);
        assert_eq!(stats.top_n(10), vec![(a, 50), (b, 30), (c, 10), (d, 5)]);
        assert!(stats.top_n(0).is_empty());
    }

    #[test]
    fn top_n_with_ties_is_non_increasing() {
        let stats = StatsAggregator::new();
        for amount in [8, 8, 3, 8, 1] {
            let _ = stats.add(RecipientId::new(), amount);
        }
        let top = stats.top_n(5);
        assert_eq!(top.len(), 5);
        assert!(top.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn snapshot_is_isolated_from_later_writes() {
        let stats = StatsAggregator::new();
        let id = RecipientId::new();
        let _ = stats.add(id, 10);

        let snapshot = stats.snapshot();
        let _ = stats.add(id, 5);
        let _ = stats.add(RecipientId::new(), 1);
        let _ = stats.reset(id);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get(&id), Some(&10));
    }

    #[test]
    fn restore_skips_malformed_keys() {
        let stats = StatsAggregator::new();
        let good = RecipientId::new();
        let raw = vec![
            (good.to_string(), 120),
            ("definitely-not-a-uuid".to_owned(), 99),
            (String::new(), 3),
        ];

        let report = stats.restore(raw);

        assert_eq!(report.loaded, 1);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(stats.get(good), 120);
        assert_eq!(stats.len(), 1);
    }

    #[test]
    fn concurrent_adds_lose_nothing() {
        let stats = StatsAggregator::new();
        let shared = RecipientId::new();
        let own: Vec<RecipientId> = (0..8).map(|_| RecipientId::new()).collect();

        std::thread::scope(|scope| {
            for (thread, id) in own.iter().enumerate() {
                let stats = &stats;
                scope.spawn(move || {
                    for i in 1..=1_000_u64 {
                        let _ = stats.add(shared, i);
                        let _ = stats.add(*id, u64::try_from(thread).unwrap() + 1);
                    }
                });
            }
        });

        // 8 threads x sum(1..=1000)
        assert_eq!(stats.get(shared), 8 * 500_500);
        for (thread, id) in own.iter().enumerate() {
            assert_eq!(stats.get(*id), 1_000 * (u64::try_from(thread).unwrap() + 1));
        }
    }
}
