//! Health and Stats Reporter
//!
//! Liveness probe and a typed view of the store's `INFO` telemetry.

use std::str::FromStr;

use chrono::Utc;

use crate::cache::CacheService;
use crate::error::{CacheError, Result};
use crate::models::StatsSnapshot;

const PING_REPLY: &str = "PONG";

impl CacheService {
    /// True only if the store answers the liveness probe with `PONG`.
    pub async fn health_check(&self) -> bool {
        self.guard("health_check", "PING", false, async {
            self.connector.ping().await.map(|reply| reply == PING_REPLY)
        })
        .await
    }

    /// Reads fresh store telemetry. Server fields are zeroed if the store is
    /// unreachable or the payload is malformed; local counters are always set.
    pub async fn get_stats(&self) -> StatsSnapshot {
        let server = self
            .guard("get_stats", "INFO", StatsSnapshot::default(), async {
                self.connector.info().await.and_then(|payload| parse_info(&payload))
            })
            .await;

        StatsSnapshot {
            captured_at: Utc::now(),
            local: self.stats.snapshot(),
            ..server
        }
    }
}

/// Parses a Redis `INFO` payload. Unknown fields are ignored, missing ones
/// stay zero, a known field with a malformed value fails the whole parse.
pub fn parse_info(payload: &str) -> Result<StatsSnapshot> {
    let mut snapshot = StatsSnapshot::default();

    for line in payload.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((field, value)) = line.split_once(':') else {
            continue;
        };

        match field {
            "uptime_in_seconds" => snapshot.uptime_in_seconds = number(field, value)?,
            "connected_clients" => snapshot.connected_clients = number(field, value)?,
            "used_memory" => snapshot.used_memory = number(field, value)?,
            "used_memory_human" => snapshot.used_memory_human = value.to_string(),
            "used_memory_peak" => snapshot.used_memory_peak = number(field, value)?,
            "mem_fragmentation_ratio" => {
                snapshot.mem_fragmentation_ratio = number(field, value)?
            }
            "keyspace_hits" => snapshot.keyspace_hits = number(field, value)?,
            "keyspace_misses" => snapshot.keyspace_misses = number(field, value)?,
            db if is_keyspace_field(db) => {
                let (keys, expires) = parse_keyspace(db, value)?;
                snapshot.total_keys += keys;
                snapshot.expiring_keys += expires;
            }
            _ => {}
        }
    }

    Ok(snapshot)
}

fn number<T: FromStr>(field: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        CacheError::Deserialization(format!("INFO field {} has malformed value '{}'", field, value))
    })
}

/// `db0`, `db15`, ...
fn is_keyspace_field(field: &str) -> bool {
    field
        .strip_prefix("db")
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Parses `keys=12,expires=3,avg_ttl=0`.
fn parse_keyspace(field: &str, value: &str) -> Result<(u64, u64)> {
    let mut keys = 0;
    let mut expires = 0;
    for part in value.split(',') {
        match part.split_once('=') {
            Some(("keys", n)) => keys = number(field, n)?,
            Some(("expires", n)) => expires = number(field, n)?,
            _ => {}
        }
    }
    Ok((keys, expires))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::connector::MemoryConnector;
    use std::sync::Arc;

    const SAMPLE_INFO: &str = "# Server\r\n\
        redis_version:7.2.4\r\n\
        executable:/usr/local/bin/redis-server\r\n\
        uptime_in_seconds:3600\r\n\
        \r\n\
        # Clients\r\n\
        connected_clients:12\r\n\
        \r\n\
        # Memory\r\n\
        used_memory:1048576\r\n\
        used_memory_human:1.00M\r\n\
        used_memory_peak:2097152\r\n\
        mem_fragmentation_ratio:1.35\r\n\
        \r\n\
        # Stats\r\n\
        keyspace_hits:900\r\n\
        keyspace_misses:100\r\n\
        \r\n\
        # Keyspace\r\n\
        db0:keys=40,expires=30,avg_ttl=12000\r\n\
        db2:keys=2,expires=0,avg_ttl=0\r\n";

    #[test]
    fn test_parse_info_sample() {
        let snapshot = parse_info(SAMPLE_INFO).unwrap();

        assert_eq!(snapshot.uptime_in_seconds, 3600);
        assert_eq!(snapshot.connected_clients, 12);
        assert_eq!(snapshot.used_memory, 1_048_576);
        assert_eq!(snapshot.used_memory_human, "1.00M");
        assert_eq!(snapshot.used_memory_peak, 2_097_152);
        assert!((snapshot.mem_fragmentation_ratio - 1.35).abs() < f64::EPSILON);
        assert_eq!(snapshot.keyspace_hits, 900);
        assert_eq!(snapshot.keyspace_misses, 100);
        assert_eq!(snapshot.total_keys, 42);
        assert_eq!(snapshot.expiring_keys, 30);
        assert!((snapshot.keyspace_hit_rate() - 0.9).abs() < 0.001);
    }

    #[test]
    fn test_parse_info_missing_fields_default_to_zero() {
        let snapshot = parse_info("# Clients\r\nconnected_clients:3\r\n").unwrap();
        assert_eq!(snapshot.connected_clients, 3);
        assert_eq!(snapshot.used_memory, 0);
        assert_eq!(snapshot.total_keys, 0);
    }

    #[test]
    fn test_parse_info_malformed_value_fails() {
        let result = parse_info("connected_clients:many\r\n");
        assert!(matches!(result, Err(CacheError::Deserialization(_))));
    }

    #[test]
    fn test_keyspace_field_detection() {
        assert!(is_keyspace_field("db0"));
        assert!(is_keyspace_field("db15"));
        assert!(!is_keyspace_field("db"));
        assert!(!is_keyspace_field("dbx"));
    }

    #[tokio::test]
    async fn test_health_and_stats_on_memory_store() {
        let cache = CacheService::new(Arc::new(MemoryConnector::new()), &Config::default()).unwrap();
        assert!(cache.health_check().await);

        cache.set("projects:project:P1", &"x", None).await;
        cache.get::<String>("projects:project:P1").await;

        let stats = cache.get_stats().await;
        assert_eq!(stats.total_keys, 1);
        assert_eq!(stats.keyspace_hits, 1);
        assert_eq!(stats.local.hits, 1);
        assert_eq!(stats.local.sets, 1);
    }
}
