//! Stored Entry Module
//!
//! A payload held by the in-memory connector, with millisecond expiry.

use chrono::Utc;

// == Stored Entry ==
/// Represents a single stored payload with its expiry.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    /// Encoded payload
    pub value: String,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl StoredEntry {
    // == Constructor ==
    /// Creates a new entry expiring `ttl_ms` milliseconds from now.
    pub fn new(value: String, ttl_ms: Option<u64>) -> Self {
        Self {
            value,
            expires_at: ttl_ms.map(|ttl| current_timestamp_ms().saturating_add(ttl)),
        }
    }

    // == Is Expired ==
    /// An entry is expired once the current time reaches its expiration time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        matches!(self.expires_at, Some(expires) if now_ms >= expires)
    }

    // == Reset TTL ==
    pub fn set_ttl_ms(&mut self, ttl_ms: u64) {
        self.expires_at = Some(current_timestamp_ms().saturating_add(ttl_ms));
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}
