//! Telemetry snapshot returned by `CacheService::get_stats`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::CacheStats;

/// Point-in-time server telemetry plus the service's local counters.
///
/// Never cached; every call to `get_stats` reads a fresh one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// When the snapshot was taken
    pub captured_at: DateTime<Utc>,
    pub uptime_in_seconds: u64,
    pub connected_clients: u64,
    /// Bytes used by the store
    pub used_memory: u64,
    pub used_memory_human: String,
    pub used_memory_peak: u64,
    pub mem_fragmentation_ratio: f64,
    pub keyspace_hits: u64,
    pub keyspace_misses: u64,
    /// Keys across all logical databases
    pub total_keys: u64,
    /// Keys with an expiry across all logical databases
    pub expiring_keys: u64,
    /// Counters kept by this service instance
    pub local: CacheStats,
}

impl StatsSnapshot {
    /// Server-side hit rate, or 0.0 before any lookup.
    pub fn keyspace_hit_rate(&self) -> f64 {
        let total = self.keyspace_hits + self.keyspace_misses;
        if total == 0 {
            0.0
        } else {
            self.keyspace_hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyspace_hit_rate() {
        let snapshot = StatsSnapshot {
            keyspace_hits: 80,
            keyspace_misses: 20,
            ..StatsSnapshot::default()
        };
        assert!((snapshot.keyspace_hit_rate() - 0.8).abs() < 0.001);
        assert_eq!(StatsSnapshot::default().keyspace_hit_rate(), 0.0);
    }

    #[test]
    fn test_snapshot_serialize() {
        let json = serde_json::to_string(&StatsSnapshot::default()).unwrap();
        assert!(json.contains("captured_at"));
        assert!(json.contains("\"local\":{"));
    }
}
