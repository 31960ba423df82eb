//! Per-client fixed-window request counter.
//!
//! # Design Decisions
//! - One record per fingerprint: `{window_start, count}`, O(1) per request
//! - Records live in a sharded `DashMap`; the read-modify-write for one key
//!   happens under that key's shard guard, unrelated clients rarely contend
//! - Count saturates at the ceiling, rejected attempts never push it further
//! - The table is bounded: a new fingerprint at capacity evicts one record,
//!   the first stale window among a small sample or else the sample's oldest
//! - New fingerprints are inserted one at a time, so concurrent first-seen
//!   clients cannot push the table past capacity
//! - Full sweeps belong to the background sweeper, never the request path

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use dashmap::DashMap;

use crate::observability::metrics;
use crate::security::clock::Clock;
use crate::security::fingerprint::Fingerprint;

/// Records inspected when choosing an eviction victim.
const EVICTION_SAMPLE: usize = 32;

#[derive(Debug, Clone, Copy)]
struct WindowRecord {
    window_start: SystemTime,
    count: u32,
}

impl WindowRecord {
    fn expired(&self, now: SystemTime, window: Duration) -> bool {
        now.duration_since(self.window_start).unwrap_or_default() >= window
    }

    fn admit(&mut self, now: SystemTime, window: Duration, max_count: u32) -> WindowDecision {
        if self.expired(now, window) {
            self.window_start = now;
            self.count = 0;
        }

        let allowed = self.count < max_count;
        if allowed {
            self.count += 1;
        }

        WindowDecision {
            allowed,
            remaining: max_count.saturating_sub(self.count),
            reset_at: self.window_start + window,
        }
    }
}

/// Outcome of one counter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at: SystemTime,
}

/// Table of fixed windows keyed by fingerprint.
#[derive(Debug)]
pub struct WindowCounter {
    records: DashMap<Fingerprint, WindowRecord>,
    insert_lock: Mutex<()>,
    clock: Arc<dyn Clock>,
    capacity: usize,
}

impl WindowCounter {
    pub fn new(clock: Arc<dyn Clock>, capacity: usize) -> Self {
        Self {
            records: DashMap::new(),
            insert_lock: Mutex::new(()),
            clock,
            capacity: capacity.max(1),
        }
    }

    /// Count one request for `fingerprint` and decide whether it fits in the window.
    pub fn check_and_increment(
        &self,
        fingerprint: &Fingerprint,
        window: Duration,
        max_count: u32,
    ) -> WindowDecision {
        let now = self.clock.now();

        // Known client: the shard guard covers the whole read-modify-write.
        if let Some(mut record) = self.records.get_mut(fingerprint) {
            return record.admit(now, window, max_count);
        }

        let _inserting = self.insert_lock.lock().unwrap_or_else(|e| e.into_inner());
        if !self.records.contains_key(fingerprint) && self.records.len() >= self.capacity {
            self.evict_one(now, window);
        }

        let mut record = self
            .records
            .entry(fingerprint.clone())
            .or_insert_with(|| WindowRecord {
                window_start: now,
                count: 0,
            });
        record.admit(now, window, max_count)
    }

    /// Drop every record whose window has already closed. Returns how many were removed.
    pub fn sweep(&self, window: Duration) -> usize {
        let now = self.clock.now();
        let before = self.records.len();
        self.records.retain(|_, record| !record.expired(now, window));
        let removed = before.saturating_sub(self.records.len());
        metrics::record_tracked_clients(self.records.len());
        removed
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn evict_one(&self, now: SystemTime, window: Duration) {
        let mut oldest: Option<(Fingerprint, SystemTime)> = None;
        let mut stale = None;
        for entry in self.records.iter().take(EVICTION_SAMPLE) {
            let record = entry.value();
            if record.expired(now, window) {
                stale = Some(entry.key().clone());
                break;
            }
            if oldest.as_ref().map_or(true, |(_, start)| record.window_start < *start) {
                oldest = Some((entry.key().clone(), record.window_start));
            }
        }

        // The iterator's shard guards are released before removing.
        if let Some(key) = stale {
            self.records.remove(&key);
            tracing::debug!(evicted = %key, "Counter table full, dropped stale window");
        } else if let Some((key, _)) = oldest {
            self.records.remove(&key);
            metrics::record_counter_eviction();
            tracing::warn!(
                evicted = %key,
                capacity = self.capacity,
                "Counter table full, evicted oldest sampled window"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::clock::ManualClock;

    const WINDOW: Duration = Duration::from_secs(60);

    fn counter(capacity: usize) -> (Arc<ManualClock>, WindowCounter) {
        let clock = Arc::new(ManualClock::default());
        let counter = WindowCounter::new(clock.clone(), capacity);
        (clock, counter)
    }

    #[test]
    fn test_admits_up_to_ceiling_then_rejects() {
        let (_, counter) = counter(16);
        let fp = Fingerprint::new("1.2.3.4");

        for expected_remaining in (0..5).rev() {
            let d = counter.check_and_increment(&fp, WINDOW, 5);
            assert!(d.allowed);
            assert_eq!(d.remaining, expected_remaining);
        }

        let d = counter.check_and_increment(&fp, WINDOW, 5);
        assert!(!d.allowed);
        assert_eq!(d.remaining, 0);
    }

    #[test]
    fn test_count_saturates_on_rejection() {
        let (clock, counter) = counter(16);
        let fp = Fingerprint::new("1.2.3.4");
        for _ in 0..50 {
            counter.check_and_increment(&fp, WINDOW, 3);
        }
        let reset_at = counter.check_and_increment(&fp, WINDOW, 3).reset_at;

        // Retries did not move the window start.
        assert_eq!(reset_at, clock.now() + WINDOW);
        assert_eq!(counter.records.get(&fp).unwrap().count, 3);
    }

    #[test]
    fn test_window_resets_after_expiry() {
        let (clock, counter) = counter(16);
        let fp = Fingerprint::new("1.2.3.4");
        for _ in 0..3 {
            counter.check_and_increment(&fp, WINDOW, 3);
        }
        assert!(!counter.check_and_increment(&fp, WINDOW, 3).allowed);

        clock.advance(WINDOW);
        let d = counter.check_and_increment(&fp, WINDOW, 3);
        assert!(d.allowed);
        assert_eq!(d.remaining, 2);
        assert_eq!(d.reset_at, clock.now() + WINDOW);
    }

    #[test]
    fn test_reset_at_is_window_start_plus_duration() {
        let (clock, counter) = counter(16);
        let fp = Fingerprint::new("a");
        let start = clock.now();
        counter.check_and_increment(&fp, WINDOW, 10);
        clock.advance(Duration::from_secs(30));
        let d = counter.check_and_increment(&fp, WINDOW, 10);
        assert_eq!(d.reset_at, start + WINDOW);
    }

    #[test]
    fn test_fingerprints_are_independent() {
        let (_, counter) = counter(16);
        let a = Fingerprint::new("a");
        let b = Fingerprint::new("b");
        assert!(counter.check_and_increment(&a, WINDOW, 1).allowed);
        assert!(!counter.check_and_increment(&a, WINDOW, 1).allowed);
        assert!(counter.check_and_increment(&b, WINDOW, 1).allowed);
    }

    #[test]
    fn test_sweep_removes_only_stale_windows() {
        let (clock, counter) = counter(16);
        counter.check_and_increment(&Fingerprint::new("old"), WINDOW, 10);
        clock.advance(Duration::from_secs(45));
        counter.check_and_increment(&Fingerprint::new("fresh"), WINDOW, 10);
        clock.advance(Duration::from_secs(20));

        assert_eq!(counter.sweep(WINDOW), 1);
        assert_eq!(counter.len(), 1);
        assert!(counter.records.contains_key(&Fingerprint::new("fresh")));
    }

    #[test]
    fn test_capacity_drops_stale_window_first() {
        let (clock, counter) = counter(2);
        counter.check_and_increment(&Fingerprint::new("a"), WINDOW, 10);
        clock.advance(WINDOW);
        counter.check_and_increment(&Fingerprint::new("b"), WINDOW, 10);
        counter.check_and_increment(&Fingerprint::new("c"), WINDOW, 10);

        assert_eq!(counter.len(), 2);
        assert!(!counter.records.contains_key(&Fingerprint::new("a")));
    }

    #[test]
    fn test_capacity_evicts_oldest_live_window() {
        let (clock, counter) = counter(2);
        counter.check_and_increment(&Fingerprint::new("a"), WINDOW, 10);
        clock.advance(Duration::from_secs(1));
        counter.check_and_increment(&Fingerprint::new("b"), WINDOW, 10);
        clock.advance(Duration::from_secs(1));
        counter.check_and_increment(&Fingerprint::new("c"), WINDOW, 10);

        assert_eq!(counter.len(), 2);
        assert!(!counter.records.contains_key(&Fingerprint::new("a")));
        assert!(counter.records.contains_key(&Fingerprint::new("b")));
        assert!(counter.records.contains_key(&Fingerprint::new("c")));
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::default());
        let counter = Arc::new(WindowCounter::new(clock, 16));
        let fp = Fingerprint::new("shared");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = counter.clone();
                let fp = fp.clone();
                std::thread::spawn(move || {
                    (0..50)
                        .filter(|_| counter.check_and_increment(&fp, WINDOW, 100).allowed)
                        .count()
                })
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 100);
    }

    #[test]
    fn test_capacity_holds_under_concurrent_new_clients() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::default());
        let counter = Arc::new(WindowCounter::new(clock, 8));

        let handles: Vec<_> = (0..8)
            .map(|thread| {
                let counter = counter.clone();
                std::thread::spawn(move || {
                    for i in 0..200 {
                        let fp = Fingerprint::new(format!("client-{thread}-{i}"));
                        assert!(counter.check_and_increment(&fp, WINDOW, 10).allowed);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counter.len(), 8);
    }

    #[test]
    fn test_full_table_admits_newcomer_by_evicting_one() {
        let (clock, counter) = counter(EVICTION_SAMPLE * 4);
        for i in 0..EVICTION_SAMPLE * 4 {
            counter.check_and_increment(&Fingerprint::new(format!("c{i}")), WINDOW, 10);
            clock.advance(Duration::from_millis(10));
        }

        counter.check_and_increment(&Fingerprint::new("newcomer"), WINDOW, 10);
        assert_eq!(counter.len(), EVICTION_SAMPLE * 4);
        assert!(counter.records.contains_key(&Fingerprint::new("newcomer")));
    }
}
