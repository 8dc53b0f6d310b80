//! Distributed Lock Module
//!
//! Mutual-exclusion leases stored under the `locks:` namespace. A lease is
//! taken with an atomic set-if-absent and released with a server-side
//! compare-and-delete, so only the holder of the current token can release it.
//! Leases always carry a TTL and vanish on their own if never released.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::keys;
use crate::cache::CacheService;
use crate::connector::COMPARE_AND_DELETE;

// == Lock Token ==
/// Opaque proof of lease ownership, required to release the lease.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockToken(String);

impl LockToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for LockToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl fmt::Display for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// == Token Generator ==
/// Produces `<unix-ms>-<counter>-<random>` tokens, unique per attempt.
///
/// The counter separates attempts made in the same millisecond by this
/// process; the random suffix separates processes.
#[derive(Debug, Default)]
pub struct TokenGenerator {
    counter: AtomicU64,
}

impl TokenGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_token(&self) -> LockToken {
        let sequence = self.counter.fetch_add(1, Ordering::Relaxed);
        LockToken(format!(
            "{}-{}-{:08x}",
            Utc::now().timestamp_millis(),
            sequence,
            rand::random::<u32>()
        ))
    }
}

impl CacheService {
    // == Acquire ==
    /// Tries once to take the lease `locks:<resource_name>:<scope_id>` for
    /// `ttl_ms` milliseconds (service default if None).
    ///
    /// Returns the token on success and `None` if the lease is held
    /// elsewhere or `ttl_ms` is zero. Never waits or retries. A store error also yields `None`:
    /// not acquiring is the safe reading when exclusivity cannot be proven.
    pub async fn acquire_lock(
        &self,
        resource_name: &str,
        scope_id: &str,
        ttl_ms: Option<u64>,
    ) -> Option<LockToken> {
        let key = keys::lock(resource_name, scope_id);
        let ttl_ms = ttl_ms.unwrap_or(self.lock_ttl_ms);
        let token = self.tokens.next_token();

        let acquired = self
            .guard("acquire_lock", &key, false, async {
                let full = self.full_key(&key)?;
                keys::check_ttl(ttl_ms)?;
                self.connector.set_nx_px(&full, token.as_str(), ttl_ms).await
            })
            .await;

        if acquired {
            debug!(op = "acquire_lock", key = %key, ttl_ms, "lock acquired");
            Some(token)
        } else {
            None
        }
    }

    // == Release ==
    /// Releases the lease if and only if it is still held with `token`.
    ///
    /// Returns false when the lease is absent (expired or never taken), held
    /// under another token, or the store could not be reached. In the last
    /// case the lease is left to expire through its TTL.
    pub async fn release_lock(&self, resource_name: &str, scope_id: &str, token: &LockToken) -> bool {
        let key = keys::lock(resource_name, scope_id);

        let released = self
            .guard("release_lock", &key, false, async {
                let full = self.full_key(&key)?;
                self.connector
                    .eval(&COMPARE_AND_DELETE, &[full], &[token.to_string()])
                    .await
                    .map(|deleted| deleted == 1)
            })
            .await;

        debug!(op = "release_lock", key = %key, released, "lock release attempted");
        released
    }
}
