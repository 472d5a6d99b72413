//! Periodic Expiry Sweep Scheduling
//!
//! Lazy expiry (checking on access) is cheap, but a key that expires and is
//! never touched again would stay in memory forever. The event loop
//! therefore sweeps the whole key space on a fixed interval.
//!
//! ## Design
//!
//! There is no background task: the sweep runs on the event loop thread.
//! On every loop iteration the loop asks the [`SweepTimer`] whether a sweep
//! is due, runs [`CacheStore::sweep_expired`] if so, and then bounds its
//! blocking poll by [`SweepTimer::time_until_due`]. An idle server still
//! sweeps on schedule, and a sweep never overlaps a command.
//!
//! [`CacheStore::sweep_expired`]: crate::storage::CacheStore::sweep_expired

use crate::storage::CacheStore;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Default interval between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Tracks when the last sweep ran and when the next one is due.
#[derive(Debug, Clone)]
pub struct SweepTimer {
    interval: Duration,
    last_sweep: Option<Instant>,
}

impl Default for SweepTimer {
    fn default() -> Self {
        Self::new(DEFAULT_SWEEP_INTERVAL)
    }
}

impl SweepTimer {
    /// Creates a timer that has never fired, so the first check is due.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_sweep: None,
        }
    }

    /// Returns the configured interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns when the last sweep ran, if ever.
    pub fn last_sweep(&self) -> Option<Instant> {
        self.last_sweep
    }

    /// Returns true if `now >= last_sweep + interval`, or no sweep has run yet.
    pub fn is_due(&self, now: Instant) -> bool {
        match self.next_due() {
            Some(due) => now >= due,
            None => self.last_sweep.is_none(),
        }
    }

    /// Time left until the next sweep is due (zero if it is already due).
    ///
    /// An interval too long for the clock yields `Duration::MAX`.
    pub fn time_until_due(&self, now: Instant) -> Duration {
        match (self.last_sweep, self.next_due()) {
            (None, _) => Duration::ZERO,
            (Some(_), Some(due)) => due.saturating_duration_since(now),
            (Some(_), None) => Duration::MAX,
        }
    }

    /// The instant the next sweep is due, if it can be represented.
    fn next_due(&self) -> Option<Instant> {
        self.last_sweep?.checked_add(self.interval)
    }

    /// Records that a sweep ran at `now`.
    pub fn mark(&mut self, now: Instant) {
        self.last_sweep = Some(now);
    }

    /// Sweeps `cache` if a sweep is due at `now`.
    ///
    /// # Returns
    ///
    /// `Some(evicted)` when a sweep ran, `None` when it was not due.
    pub fn run_if_due(&mut self, cache: &mut CacheStore, now: Instant) -> Option<u64> {
        if !self.is_due(now) {
            return None;
        }

        let evicted = cache.sweep_expired_at(now);
        self.mark(now);

        if evicted > 0 {
            debug!(
                evicted = evicted,
                keys_remaining = cache.len(),
                "Expired keys swept"
            );
        } else {
            trace!("Sweep found no expired keys");
        }

        Some(evicted)
    }
}
