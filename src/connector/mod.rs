//! Store Connector Module
//!
//! Thin async interface over one external key-value store. Everything above
//! this layer talks to the store only through [`StoreConnector`].

mod entry;
mod glob;
mod memory;
mod redis;

use async_trait::async_trait;

use crate::error::Result;

pub use entry::{current_timestamp_ms, StoredEntry};
pub use glob::glob_match;
pub use memory::MemoryConnector;
pub use self::redis::RedisConnector;

// == Store Connector ==
/// Primitive commands the cache service needs from a key-value store.
///
/// Keys reaching this trait are already validated and prefixed. Every method
/// may fail with [`crate::error::CacheError::Connectivity`].
#[async_trait]
pub trait StoreConnector: Send + Sync {
    /// Reads the raw payload stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes `value` under `key`, expiring after `ttl_secs` seconds.
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()>;

    /// Writes `value` only if `key` is absent, expiring after `ttl_ms`.
    ///
    /// Returns `true` when the write happened.
    async fn set_nx_px(&self, key: &str, value: &str, ttl_ms: u64) -> Result<bool>;

    /// Deletes all `keys` in one command, returning how many existed.
    async fn del(&self, keys: &[String]) -> Result<u64>;

    /// Reads all `keys` in one command, preserving order.
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>>;

    /// Sends every queued command in one round trip.
    async fn execute(&self, pipeline: Pipeline) -> Result<()>;

    /// Lists keys matching a glob `pattern`.
    async fn scan(&self, pattern: &str) -> Result<Vec<String>>;

    /// Runs a server-side script atomically.
    async fn eval(&self, script: &StoreScript, keys: &[String], args: &[String]) -> Result<i64>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// Resets the TTL of an existing key. Returns `false` if the key is absent.
    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool>;

    /// Liveness probe, returns the raw reply.
    async fn ping(&self) -> Result<String>;

    /// Line-oriented server telemetry (Redis `INFO` format).
    async fn info(&self) -> Result<String>;
}

// == Pipeline ==
/// A command queued in a [`Pipeline`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineCommand {
    SetEx {
        key: String,
        value: String,
        ttl_secs: u64,
    },
}

/// Batch of commands executed in one round trip by [`StoreConnector::execute`].
///
/// A pipeline guarantees a single round trip, not atomicity across keys.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    commands: Vec<PipelineCommand>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a set-with-expiry.
    pub fn set_ex(&mut self, key: impl Into<String>, value: impl Into<String>, ttl_secs: u64) -> &mut Self {
        self.commands.push(PipelineCommand::SetEx {
            key: key.into(),
            value: value.into(),
            ttl_secs,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[PipelineCommand] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<PipelineCommand> {
        self.commands
    }
}

// == Store Script ==
/// A server-side script, identified by name so that connectors without a
/// script engine can recognise the ones they implement natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreScript {
    pub name: &'static str,
    pub source: &'static str,
}

/// Deletes `KEYS[1]` only when its value equals `ARGV[1]`. Returns 1 on delete.
pub const COMPARE_AND_DELETE: StoreScript = StoreScript {
    name: "compare_and_delete",
    source: r#"if redis.call("get", KEYS[1]) == ARGV[1] then
    return redis.call("del", KEYS[1])
else
    return 0
end"#,
};
