//! Cache Statistics Module
//!
//! Service-side counters for hits, misses, writes and swallowed errors. The
//! counters are atomics so a shared `CacheService` can update them through `&self`.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

// == Cache Stats ==
/// Point-in-time copy of the local counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Reads that returned a value
    pub hits: u64,
    /// Reads that returned nothing (absent, invalid key, bad payload, outage)
    pub misses: u64,
    /// Successful writes
    pub sets: u64,
    /// Store or codec errors swallowed at the service boundary
    pub errors: u64,
}

impl CacheStats {
    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Stats Recorder ==
/// Lock-free counters behind [`CacheStats`].
#[derive(Debug, Default)]
pub struct StatsRecorder {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    errors: AtomicU64,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts `n` hits at once, for batch reads.
    pub fn record_hits(&self, n: u64) {
        self.hits.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts `n` misses at once, for batch reads.
    pub fn record_misses(&self, n: u64) {
        self.misses.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_sets(&self, n: u64) {
        self.sets.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}
