//! Cache Service Module
//!
//! Cache-aside operations over a [`StoreConnector`]. Every public operation is
//! fail-open: errors are logged and mapped to the operation's "nothing
//! happened" value, so a cache outage only costs the caller a trip to the
//! authoritative store.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::cache::lock::TokenGenerator;
use crate::cache::stats::{CacheStats, StatsRecorder};
use crate::cache::{codec, keys};
use crate::config::Config;
use crate::connector::{Pipeline, StoreConnector};
use crate::error::{CacheError, Result};
use crate::models::BatchEntry;

// == Cache Service ==
/// Shared cache client, constructed once at startup and passed by `Arc`.
pub struct CacheService {
    pub(crate) connector: Arc<dyn StoreConnector>,
    /// Global prefix including its trailing colon, or empty
    prefix: String,
    pub(crate) default_ttl: u64,
    pub(crate) max_key_length: usize,
    pub(crate) lock_ttl_ms: u64,
    pub(crate) stats: StatsRecorder,
    pub(crate) tokens: TokenGenerator,
}

impl CacheService {
    // == Constructor ==
    /// Builds the service over `connector`, reading tunables from `config`.
    pub fn new(connector: Arc<dyn StoreConnector>, config: &Config) -> Result<Self> {
        config.validate()?;
        let prefix = if config.key_prefix.is_empty() {
            String::new()
        } else {
            format!("{}:", config.key_prefix.trim_end_matches(':'))
        };

        Ok(Self {
            connector,
            prefix,
            default_ttl: config.default_ttl,
            max_key_length: config.max_key_length,
            lock_ttl_ms: config.lock_ttl_ms,
            stats: StatsRecorder::new(),
            tokens: TokenGenerator::new(),
        })
    }

    /// Local counters of this instance.
    pub fn local_stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    // == Key Helpers ==
    /// Validates a caller key and returns the key as stored.
    pub(crate) fn full_key(&self, key: &str) -> Result<String> {
        keys::check(key, self.key_budget())?;
        Ok(self.apply_prefix(key))
    }

    /// Length left for caller keys once the prefix is accounted for.
    pub(crate) fn key_budget(&self) -> usize {
        self.max_key_length.saturating_sub(self.prefix.len())
    }

    fn apply_prefix(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn strip_prefix<'a>(&self, key: &'a str) -> &'a str {
        key.strip_prefix(self.prefix.as_str()).unwrap_or(key)
    }

    // == Fail-open Guard ==
    /// Awaits `op_future`, logging any error and substituting `fallback`.
    pub(crate) async fn guard<T, F>(&self, op: &'static str, target: &str, fallback: T, op_future: F) -> T
    where
        F: Future<Output = Result<T>>,
    {
        match op_future.await {
            Ok(value) => value,
            Err(err) => {
                self.report(op, target, &err);
                fallback
            }
        }
    }

    pub(crate) fn report(&self, op: &'static str, target: &str, err: &CacheError) {
        match err {
            CacheError::InvalidKey(_) | CacheError::InvalidTtl(_) => {
                warn!(op, key = target, kind = err.kind(), error = %err, "cache key rejected");
            }
            _ => {
                self.stats.record_error();
                error!(op, key = target, kind = err.kind(), error = %err, "cache operation failed");
            }
        }
    }

    // == Get ==
    /// Reads and decodes `key`. Absent, invalid, undecodable and unreachable
    /// all read as `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self
            .guard("get", key, None, async {
                let full = self.full_key(key)?;
                match self.connector.get(&full).await? {
                    Some(payload) => codec::decode(&payload).map(Some),
                    None => Ok(None),
                }
            })
            .await;

        if value.is_some() {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
        }
        value
    }

    // == Set ==
    /// Encodes and stores `value` for `ttl` seconds (service default if None).
    ///
    /// Returns false without touching the store if the key is invalid, the
    /// TTL is zero or the value cannot be encoded.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Option<u64>) -> bool {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let stored = self
            .guard("set", key, false, async {
                let full = self.full_key(key)?;
                keys::check_ttl(ttl)?;
                let payload = codec::encode(value)?;
                self.connector
                    .set_ex(&full, &payload, ttl)
                    .await
                    .map(|()| true)
            })
            .await;

        if stored {
            self.stats.record_sets(1);
            debug!(op = "set", key, ttl, "cache entry stored");
        }
        stored
    }

    // == Delete ==
    /// Deletes `keys` in one command and returns how many existed.
    ///
    /// Invalid keys are skipped. Nothing valid to delete means no store call.
    pub async fn del<K: AsRef<str>>(&self, keys: &[K]) -> u64 {
        let full = self.valid_keys("del", keys);
        if full.is_empty() {
            return 0;
        }

        self.guard("del", &describe(&full), 0, self.connector.del(&full))
            .await
    }

    pub async fn exists(&self, key: &str) -> bool {
        self.guard("exists", key, false, async {
            let full = self.full_key(key)?;
            self.connector.exists(&full).await
        })
        .await
    }

    /// Resets the TTL of an existing entry. False if absent or `ttl` is zero.
    pub async fn expire(&self, key: &str, ttl: u64) -> bool {
        self.guard("expire", key, false, async {
            let full = self.full_key(key)?;
            keys::check_ttl(ttl)?;
            self.connector.expire(&full, ttl).await
        })
        .await
    }

    // == Batch Get ==
    /// Reads `keys` in one multi-get. The result has one slot per input key,
    /// in order; each slot is decoded independently.
    pub async fn mget<T: DeserializeOwned, K: AsRef<str>>(&self, keys: &[K]) -> Vec<Option<T>> {
        let mut slots: Vec<Option<T>> = keys.iter().map(|_| None).collect();
        let mut positions = Vec::with_capacity(keys.len());
        let mut full = Vec::with_capacity(keys.len());
        for (pos, key) in keys.iter().enumerate() {
            match self.full_key(key.as_ref()) {
                Ok(stored) => {
                    positions.push(pos);
                    full.push(stored);
                }
                Err(err) => self.report("mget", key.as_ref(), &err),
            }
        }

        if !full.is_empty() {
            let payloads = self
                .guard("mget", &describe(&full), Vec::new(), self.connector.mget(&full))
                .await;

            for ((pos, key), payload) in positions.into_iter().zip(&full).zip(payloads) {
                let Some(payload) = payload else { continue };
                match codec::decode(&payload) {
                    Ok(value) => slots[pos] = Some(value),
                    Err(err) => self.report("mget", key, &err),
                }
            }
        }

        let hits = slots.iter().filter(|slot| slot.is_some()).count() as u64;
        self.stats.record_hits(hits);
        self.stats.record_misses(slots.len() as u64 - hits);
        slots
    }

    // == Batch Set ==
    /// Queues one set-with-expiry per entry and sends them in one pipeline.
    ///
    /// The result is a single aggregate flag: a pipeline is one round trip,
    /// not a transaction, so a `true` does not prove every entry landed and a
    /// failure may leave some entries written. Callers needing per-entry
    /// certainty should use [`CacheService::set`]. Any invalid key, zero TTL
    /// or unencodable value rejects the whole batch before I/O.
    pub async fn mset<T: Serialize>(&self, entries: &[BatchEntry<T>]) -> bool {
        if entries.is_empty() {
            return true;
        }

        let mut pipeline = Pipeline::new();
        for entry in entries {
            let ttl = entry.ttl.unwrap_or(self.default_ttl);
            let prepared = self.full_key(&entry.key).and_then(|full| {
                keys::check_ttl(ttl)?;
                Ok((full, codec::encode(&entry.value)?))
            });
            match prepared {
                Ok((full, payload)) => {
                    pipeline.set_ex(full, payload, ttl);
                }
                Err(err) => {
                    self.report("mset", &entry.key, &err);
                    return false;
                }
            }
        }

        let queued = pipeline.len() as u64;
        let target = describe(&entries.iter().map(|e| e.key.clone()).collect::<Vec<_>>());
        let stored = self
            .guard("mset", &target, false, async {
                self.connector.execute(pipeline).await.map(|()| true)
            })
            .await;

        if stored {
            self.stats.record_sets(queued);
        }
        stored
    }

    // == Keys ==
    /// Lists keys matching the glob `pattern`, without the global prefix.
    ///
    /// Scanning is incremental on the store side; the full result is still
    /// collected in memory, so very broad patterns stay expensive.
    pub async fn keys(&self, pattern: &str) -> Vec<String> {
        self.guard("keys", pattern, Vec::new(), async {
            keys::check_pattern(pattern, self.key_budget())?;
            self.connector
                .scan(&self.apply_prefix(pattern))
                .await
                .map(|found| {
                    found
                        .iter()
                        .map(|key| self.strip_prefix(key).to_string())
                        .collect()
                })
        })
        .await
    }

    // == Delete By Pattern ==
    /// Deletes every key matching `pattern`, returning how many were removed.
    ///
    /// Lock leases are never matched: they can only be removed through
    /// [`CacheService::release_lock`] or by expiring.
    pub async fn delete_by_pattern(&self, pattern: &str) -> u64 {
        let mut matched = self.keys(pattern).await;
        matched.retain(|key| !keys::is_lock_key(key));
        if matched.is_empty() {
            return 0;
        }

        let removed = self.del(matched.as_slice()).await;
        debug!(op = "delete_by_pattern", pattern, matched = matched.len(), removed, "pattern invalidated");
        removed
    }

    fn valid_keys<K: AsRef<str>>(&self, op: &'static str, keys: &[K]) -> Vec<String> {
        keys.iter()
            .filter_map(|key| match self.full_key(key.as_ref()) {
                Ok(full) => Some(full),
                Err(err) => {
                    self.report(op, key.as_ref(), &err);
                    None
                }
            })
            .collect()
    }
}

/// Compact key list for log fields.
fn describe(keys: &[String]) -> String {
    match keys {
        [] => String::new(),
        [only] => only.clone(),
        [first, rest @ ..] => format!("{} (+{} more)", first, rest.len()),
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::MemoryConnector;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Project {
        name: String,
    }

    fn service_with(config: Config) -> (CacheService, MemoryConnector) {
        let connector = MemoryConnector::new();
        let service = CacheService::new(Arc::new(connector.clone()), &config).unwrap();
        (service, connector)
    }

    fn service() -> (CacheService, MemoryConnector) {
        service_with(Config::default())
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let (cache, _) = service();
        let project = Project { name: "Acme".into() };

        assert!(cache.set("projects:project:P1", &project, Some(300)).await);
        let cached: Option<Project> = cache.get("projects:project:P1").await;

        assert_eq!(cached, Some(project));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let (cache, _) = service();
        assert_eq!(cache.get::<Project>("projects:project:nope").await, None);
        assert_eq!(cache.local_stats().misses, 1);
    }

    #[tokio::test]
    async fn test_get_corrupted_payload_is_miss() {
        let (cache, connector) = service();
        connector.set_ex("projects:project:P1", "{not json", 60).await.unwrap();

        assert_eq!(cache.get::<Project>("projects:project:P1").await, None);
        assert_eq!(cache.local_stats().errors, 1);
    }

    #[tokio::test]
    async fn test_set_invalid_key_skips_store() {
        let (cache, connector) = service();

        assert!(!cache.set("", &1, None).await);
        assert!(!cache.set(&"k".repeat(256), &1, None).await);
        assert!(!cache.set("bad key", &1, None).await);
        assert!(connector.is_empty().await);
    }

    #[tokio::test]
    async fn test_prefix_applied_and_stripped() {
        let config = Config {
            key_prefix: "app".to_string(),
            ..Config::default()
        };
        let (cache, connector) = service_with(config);

        assert!(cache.set("a:1", &1, None).await);
        assert!(connector.exists("app:a:1").await.unwrap());
        assert_eq!(cache.keys("a:*").await, vec!["a:1".to_string()]);
        assert_eq!(cache.del(&["a:1"]).await, 1);
    }

    #[tokio::test]
    async fn test_prefix_counts_toward_key_length() {
        let config = Config {
            key_prefix: "app".to_string(),
            ..Config::default()
        };
        let (cache, connector) = service_with(config);

        assert!(!cache.set(&"k".repeat(247), &1, None).await);
        assert!(connector.is_empty().await);

        assert!(cache.set(&"k".repeat(246), &1, None).await);
        assert_eq!(connector.scan("app:*").await.unwrap()[0].len(), 250);
    }

    #[tokio::test]
    async fn test_zero_ttl_rejected_before_store() {
        let (cache, connector) = service();

        assert!(!cache.set("k:1", &1, Some(0)).await);
        assert!(connector.is_empty().await);

        let entries = vec![BatchEntry::new("k:1", 1u32), BatchEntry::new("k:2", 2u32).with_ttl(0)];
        assert!(!cache.mset(&entries).await);
        assert!(connector.is_empty().await);

        cache.set("k:3", &3, None).await;
        assert!(!cache.expire("k:3", 0).await);
        assert_eq!(cache.get::<u32>("k:3").await, Some(3));
        assert_eq!(cache.local_stats().errors, 0);
    }

    #[tokio::test]
    async fn test_del_empty_and_repeated() {
        let (cache, _) = service();
        let none: [&str; 0] = [];
        assert_eq!(cache.del(&none).await, 0);

        cache.set("k:1", &1, None).await;
        assert_eq!(cache.del(&["k:1"]).await, 1);
        assert_eq!(cache.del(&["k:1"]).await, 0);
    }

    #[tokio::test]
    async fn test_exists_and_expire() {
        let (cache, _) = service();
        assert!(!cache.exists("k:1").await);
        assert!(!cache.expire("k:1", 10).await);

        cache.set("k:1", &"v", None).await;
        assert!(cache.exists("k:1").await);
        assert!(cache.expire("k:1", 10).await);
    }

    #[tokio::test]
    async fn test_mget_keeps_order_and_isolates_bad_entries() {
        let (cache, connector) = service();
        cache.set("k:1", &1u32, None).await;
        cache.set("k:3", &3u32, None).await;
        connector.set_ex("k:4", "garbage", 60).await.unwrap();

        let values: Vec<Option<u32>> = cache.mget(&["k:1", "k:2", "k:3", "bad key", "k:4"]).await;

        assert_eq!(values, vec![Some(1), None, Some(3), None, None]);
        let stats = cache.local_stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 3);
    }

    #[tokio::test]
    async fn test_mset_writes_all_entries() {
        let (cache, _) = service();
        let entries = vec![
            BatchEntry::new("k:1", 1u32),
            BatchEntry::new("k:2", 2u32).with_ttl(60),
        ];

        assert!(cache.mset(&entries).await);
        assert_eq!(cache.get::<u32>("k:2").await, Some(2));
        assert_eq!(cache.local_stats().sets, 2);
    }

    #[tokio::test]
    async fn test_mset_rejects_batch_with_invalid_key() {
        let (cache, connector) = service();
        let entries = vec![BatchEntry::new("k:1", 1u32), BatchEntry::new("", 2u32)];

        assert!(!cache.mset(&entries).await);
        assert!(connector.is_empty().await);
    }

    #[tokio::test]
    async fn test_mset_empty_is_success() {
        let (cache, _) = service();
        let entries: Vec<BatchEntry<u32>> = Vec::new();
        assert!(cache.mset(&entries).await);
    }

    #[tokio::test]
    async fn test_delete_by_pattern() {
        let (cache, _) = service();
        for key in ["a:1", "a:2", "b:1"] {
            cache.set(key, &key, None).await;
        }

        assert_eq!(cache.delete_by_pattern("a:*").await, 2);
        assert_eq!(cache.keys("*").await, vec!["b:1".to_string()]);
        assert_eq!(cache.delete_by_pattern("a:*").await, 0);
    }

    #[tokio::test]
    async fn test_delete_by_pattern_spares_locks() {
        let (cache, connector) = service();
        cache.set("a:1", &1, None).await;
        connector.set_nx_px("locks:export:P1", "t1", 60_000).await.unwrap();

        assert_eq!(cache.delete_by_pattern("*").await, 1);
        assert!(connector.exists("locks:export:P1").await.unwrap());
        assert_eq!(cache.keys("*").await, vec!["locks:export:P1".to_string()]);
    }

    #[tokio::test]
    async fn test_keys_rejects_bad_pattern() {
        let (cache, _) = service();
        cache.set("a:1", &1, None).await;
        assert!(cache.keys("a *").await.is_empty());
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(&[]), "");
        assert_eq!(describe(&["a".into()]), "a");
        assert_eq!(describe(&["a".into(), "b".into(), "c".into()]), "a (+2 more)");
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = Config {
            key_prefix: "bad prefix".into(),
            ..Config::default()
        };
        let result = CacheService::new(Arc::new(MemoryConnector::new()), &config);
        assert!(result.is_err());
    }
}
