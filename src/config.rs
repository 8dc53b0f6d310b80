//! Configuration Module
//!
//! Handles loading the cache service configuration from environment variables.
//! Values are read once, when the service is constructed.

use std::env;
use std::str::FromStr;

use crate::cache::keys;
use crate::error::{CacheError, Result};

/// Which store connector the service is built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Remote Redis server
    Redis,
    /// In-process store, single node only
    Memory,
}

impl FromStr for Backend {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(Backend::Redis),
            "memory" => Ok(Backend::Memory),
            other => Err(CacheError::Config(format!("unknown backend '{}'", other))),
        }
    }
}

/// Cache service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Redis connection URL
    pub redis_url: String,
    /// Store connector to build
    pub backend: Backend,
    /// Global prefix prepended (with a colon) to every stored key, empty for none
    pub key_prefix: String,
    /// Default TTL in seconds for entries without explicit TTL
    pub default_ttl: u64,
    /// Maximum stored key length in bytes, prefix and its colon included
    pub max_key_length: usize,
    /// Default lock lease lifetime in milliseconds
    pub lock_ttl_ms: u64,
    /// Connection timeout in seconds
    pub connect_timeout: u64,
    /// Per-command timeout in milliseconds
    pub operation_timeout_ms: u64,
    /// Expiry sweep interval in seconds (memory backend only)
    pub sweep_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `REDIS_URL` - Redis connection URL (default: redis://127.0.0.1:6379)
    /// - `CACHE_BACKEND` - `redis` or `memory` (default: redis)
    /// - `CACHE_KEY_PREFIX` - Global key prefix (default: none)
    /// - `CACHE_DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `CACHE_MAX_KEY_LENGTH` - Maximum key length (default: 250)
    /// - `LOCK_DEFAULT_TTL_MS` - Default lock lease in ms (default: 30000)
    /// - `REDIS_CONNECT_TIMEOUT` - Connect timeout in seconds (default: 5)
    /// - `REDIS_OPERATION_TIMEOUT_MS` - Command timeout in ms (default: 2000)
    /// - `SWEEP_INTERVAL` - Memory backend sweep frequency in seconds (default: 1)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_url: env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            backend: parse_env("CACHE_BACKEND").unwrap_or(defaults.backend),
            key_prefix: env::var("CACHE_KEY_PREFIX").unwrap_or(defaults.key_prefix),
            default_ttl: parse_env("CACHE_DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            max_key_length: parse_env("CACHE_MAX_KEY_LENGTH").unwrap_or(defaults.max_key_length),
            lock_ttl_ms: parse_env("LOCK_DEFAULT_TTL_MS").unwrap_or(defaults.lock_ttl_ms),
            connect_timeout: parse_env("REDIS_CONNECT_TIMEOUT")
                .unwrap_or(defaults.connect_timeout),
            operation_timeout_ms: parse_env("REDIS_OPERATION_TIMEOUT_MS")
                .unwrap_or(defaults.operation_timeout_ms),
            sweep_interval: parse_env("SWEEP_INTERVAL").unwrap_or(defaults.sweep_interval),
        }
    }

    /// Checks the values the service relies on at construction.
    pub fn validate(&self) -> Result<()> {
        if !self.key_prefix.is_empty() && !keys::is_key_charset(&self.key_prefix) {
            return Err(CacheError::Config(format!(
                "key prefix '{}' contains characters outside [A-Za-z0-9:_-]",
                self.key_prefix
            )));
        }
        if self.default_ttl == 0 {
            return Err(CacheError::Config("default TTL must be positive".into()));
        }
        if self.lock_ttl_ms == 0 {
            return Err(CacheError::Config("lock TTL must be positive".into()));
        }
        let prefix_len = match self.key_prefix.len() {
            0 => 0,
            n => n + 1,
        };
        if self.max_key_length <= prefix_len {
            return Err(CacheError::Config(format!(
                "max key length {} leaves no room after the {}-byte prefix",
                self.max_key_length, prefix_len
            )));
        }
        Ok(())
    }
}

fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            backend: Backend::Redis,
            key_prefix: String::new(),
            default_ttl: 300,
            max_key_length: 250,
            lock_ttl_ms: 30_000,
            connect_timeout: 5,
            operation_timeout_ms: 2_000,
            sweep_interval: 1,
        }
    }
}
