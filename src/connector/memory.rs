//! In-Memory Connector
//!
//! Single-process store implementing [`StoreConnector`] with TTL expiry,
//! glob scans and the lock release script. Used in tests and for single-node
//! deployments where no Redis server is available.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::connector::{
    current_timestamp_ms, glob_match, Pipeline, PipelineCommand, StoreConnector, StoreScript,
    StoredEntry, COMPARE_AND_DELETE,
};
use crate::error::{CacheError, Result};

// == Memory Store ==
/// Key-value map with lazy expiry and keyspace hit/miss counters.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, StoredEntry>,
    keyspace_hits: u64,
    keyspace_misses: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the live entry for `key`, dropping it first if it has expired.
    fn live(&mut self, key: &str) -> Option<&mut StoredEntry> {
        if self.entries.get(key).is_some_and(StoredEntry::is_expired) {
            self.entries.remove(key);
        }
        self.entries.get_mut(key)
    }

    // == Get ==
    pub fn get(&mut self, key: &str) -> Option<String> {
        let value = self.live(key).map(|entry| entry.value.clone());
        if value.is_some() {
            self.keyspace_hits += 1;
        } else {
            self.keyspace_misses += 1;
        }
        value
    }

    // == Set ==
    /// Stores a payload, overwriting any previous value and TTL.
    pub fn set(&mut self, key: String, value: String, ttl_ms: Option<u64>) {
        self.entries.insert(key, StoredEntry::new(value, ttl_ms));
    }

    // == Set If Absent ==
    pub fn set_nx(&mut self, key: &str, value: String, ttl_ms: Option<u64>) -> bool {
        if self.live(key).is_some() {
            return false;
        }
        self.entries
            .insert(key.to_string(), StoredEntry::new(value, ttl_ms));
        true
    }

    // == Delete ==
    pub fn delete(&mut self, key: &str) -> bool {
        self.live(key).is_some() && self.entries.remove(key).is_some()
    }

    pub fn exists(&mut self, key: &str) -> bool {
        self.live(key).is_some()
    }

    // == Expire ==
    pub fn expire(&mut self, key: &str, ttl_ms: u64) -> bool {
        match self.live(key) {
            Some(entry) => {
                entry.set_ttl_ms(ttl_ms);
                true
            }
            None => false,
        }
    }

    // == Keys ==
    /// Live keys matching `pattern`, sorted for stable output.
    pub fn keys(&self, pattern: &str) -> Vec<String> {
        let now = current_timestamp_ms();
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(key, entry)| !entry.is_expired_at(now) && glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    // == Cleanup Expired ==
    /// Removes all expired entries, returning how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = current_timestamp_ms();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn used_memory(&self) -> usize {
        self.entries
            .iter()
            .map(|(key, entry)| key.len() + entry.value.len())
            .sum()
    }

    fn volatile_count(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.expires_at.is_some())
            .count()
    }
}

// == Memory Connector ==
/// Cloneable handle on a shared [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    store: Arc<RwLock<MemoryStore>>,
    started_at: Instant,
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(MemoryStore::new())),
            started_at: Instant::now(),
        }
    }

    /// Removes expired entries. Called by the sweeper task.
    pub async fn purge_expired(&self) -> usize {
        self.store.write().await.purge_expired()
    }

    /// Number of stored entries, expired ones not yet purged included.
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    /// Renders the store's telemetry in Redis `INFO` format.
    async fn render_info(&self) -> String {
        let store = self.store.read().await;
        let used = store.used_memory();
        let mut info = format!(
            "# Server\r\nuptime_in_seconds:{}\r\n\r\n\
             # Clients\r\nconnected_clients:1\r\n\r\n\
             # Memory\r\nused_memory:{}\r\nused_memory_human:{}\r\nused_memory_peak:{}\r\n\
             mem_fragmentation_ratio:1.00\r\n\r\n\
             # Stats\r\nkeyspace_hits:{}\r\nkeyspace_misses:{}\r\n\r\n\
             # Keyspace\r\n",
            self.started_at.elapsed().as_secs(),
            used,
            human_bytes(used),
            used,
            store.keyspace_hits,
            store.keyspace_misses,
        );
        if !store.is_empty() {
            info.push_str(&format!(
                "db0:keys={},expires={},avg_ttl=0\r\n",
                store.len(),
                store.volatile_count()
            ));
        }
        info
    }
}

/// Mirrors Redis, which refuses a zero expiry on writes.
fn reject_zero_expiry(command: &str, ttl: u64) -> Result<()> {
    if ttl == 0 {
        return Err(CacheError::InvalidTtl(format!(
            "invalid expire time in '{}' command",
            command
        )));
    }
    Ok(())
}

fn human_bytes(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{}B", bytes)
    } else if b < KB * KB {
        format!("{:.2}K", b / KB)
    } else {
        format!("{:.2}M", b / (KB * KB))
    }
}

#[async_trait]
impl StoreConnector for MemoryConnector {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.store.write().await.get(key))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        reject_zero_expiry("setex", ttl_secs)?;
        self.store.write().await.set(
            key.to_string(),
            value.to_string(),
            Some(ttl_secs.saturating_mul(1000)),
        );
        Ok(())
    }

    async fn set_nx_px(&self, key: &str, value: &str, ttl_ms: u64) -> Result<bool> {
        reject_zero_expiry("set", ttl_ms)?;
        Ok(self
            .store
            .write()
            .await
            .set_nx(key, value.to_string(), Some(ttl_ms)))
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        let mut store = self.store.write().await;
        Ok(keys.iter().filter(|key| store.delete(key)).count() as u64)
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        let mut store = self.store.write().await;
        Ok(keys.iter().map(|key| store.get(key)).collect())
    }

    async fn execute(&self, pipeline: Pipeline) -> Result<()> {
        for command in pipeline.commands() {
            let PipelineCommand::SetEx { ttl_secs, .. } = command;
            reject_zero_expiry("setex", *ttl_secs)?;
        }

        let mut store = self.store.write().await;
        for command in pipeline.into_commands() {
            match command {
                PipelineCommand::SetEx {
                    key,
                    value,
                    ttl_secs,
                } => store.set(key, value, Some(ttl_secs.saturating_mul(1000))),
            }
        }
        Ok(())
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>> {
        Ok(self.store.read().await.keys(pattern))
    }

    async fn eval(&self, script: &StoreScript, keys: &[String], args: &[String]) -> Result<i64> {
        if script.name != COMPARE_AND_DELETE.name {
            return Err(CacheError::UnsupportedScript(script.name.to_string()));
        }
        let (Some(key), Some(expected)) = (keys.first(), args.first()) else {
            return Err(CacheError::Connectivity(format!(
                "{} expects one key and one argument",
                script.name
            )));
        };

        let mut store = self.store.write().await;
        let matches = store.live(key).is_some_and(|entry| &entry.value == expected);
        if matches && store.delete(key) {
            Ok(1)
        } else {
            Ok(0)
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.store.write().await.exists(key))
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool> {
        Ok(self
            .store
            .write()
            .await
            .expire(key, ttl_secs.saturating_mul(1000)))
    }

    async fn ping(&self) -> Result<String> {
        Ok("PONG".to_string())
    }

    async fn info(&self) -> Result<String> {
        Ok(self.render_info().await)
    }
}
