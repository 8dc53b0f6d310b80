//! Input for batched writes.

use serde::Deserialize;

/// One entry of an `mset` batch.
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: The value to store
/// - `ttl`: Optional TTL in seconds (uses the service default if not specified)
#[derive(Debug, Clone, Deserialize)]
pub struct BatchEntry<T> {
    pub key: String,
    pub value: T,
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl<T> BatchEntry<T> {
    pub fn new(key: impl Into<String>, value: T) -> Self {
        Self {
            key: key.into(),
            value,
            ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl: u64) -> Self {
        self.ttl = Some(ttl);
        self
    }
}
