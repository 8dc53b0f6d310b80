//! Key Validator and Namespaces
//!
//! Keys are colon-delimited paths over `[A-Za-z0-9:_-]`. Validation runs
//! before every store call so a bad key never reaches the network.

use crate::error::{CacheError, Result};

/// Namespace shared by every project-domain key.
pub const PROJECT_NAMESPACE: &str = "projects";

/// Namespace for lock leases.
pub const LOCK_NAMESPACE: &str = "locks";

fn is_key_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b':' | b'_' | b'-')
}

fn is_pattern_byte(b: u8) -> bool {
    is_key_byte(b) || matches!(b, b'*' | b'?' | b'[' | b']' | b'^')
}

/// True if every byte of `s` is allowed in a key.
pub fn is_key_charset(s: &str) -> bool {
    s.bytes().all(is_key_byte)
}

/// Checks `key` against the naming rules.
pub fn check(key: &str, max_len: usize) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("key is empty".into()));
    }
    if key.len() > max_len {
        return Err(CacheError::InvalidKey(format!(
            "key length {} exceeds maximum of {}",
            key.len(),
            max_len
        )));
    }
    if !is_key_charset(key) {
        return Err(CacheError::InvalidKey(format!(
            "key '{}' contains characters outside [A-Za-z0-9:_-]",
            key
        )));
    }
    Ok(())
}

pub fn validate(key: &str, max_len: usize) -> bool {
    check(key, max_len).is_ok()
}

/// Rejects a zero expiry, which the store refuses on writes.
pub fn check_ttl(ttl: u64) -> Result<()> {
    if ttl == 0 {
        return Err(CacheError::InvalidTtl("expiry must be at least 1".into()));
    }
    Ok(())
}

/// Checks an id that is spliced into keys and glob patterns.
///
/// Ids follow the key rules minus the colon, so an id can never widen a
/// pattern or reach into a neighbouring key segment.
pub fn check_id(id: &str, max_len: usize) -> Result<()> {
    check(id, max_len)?;
    if id.contains(':') {
        return Err(CacheError::InvalidKey(format!("id '{}' contains ':'", id)));
    }
    Ok(())
}

/// Checks a glob pattern: key characters plus `*?[]^`.
pub fn check_pattern(pattern: &str, max_len: usize) -> Result<()> {
    if pattern.is_empty() || pattern.len() > max_len {
        return Err(CacheError::InvalidKey(format!(
            "pattern length {} outside 1..={}",
            pattern.len(),
            max_len
        )));
    }
    if !pattern.bytes().all(is_pattern_byte) {
        return Err(CacheError::InvalidKey(format!(
            "pattern '{}' contains unsupported characters",
            pattern
        )));
    }
    Ok(())
}

// == Key Builders ==

pub fn project(project_id: &str) -> String {
    format!("{}:project:{}", PROJECT_NAMESPACE, project_id)
}

/// Computed aggregates for one project.
pub fn project_stats(project_id: &str) -> String {
    format!("{}:stats:{}", PROJECT_NAMESPACE, project_id)
}

/// Materialized document list for one project.
pub fn project_documents(project_id: &str) -> String {
    format!("{}:documents:{}", PROJECT_NAMESPACE, project_id)
}

/// Sub-entries hanging off a project key.
pub fn project_derived_pattern(project_id: &str) -> String {
    format!("{}:*", project(project_id))
}

pub fn project_list(owner_id: &str, page: u32, limit: u32) -> String {
    format!("{}:list:{}:{}:{}", PROJECT_NAMESPACE, owner_id, page, limit)
}

pub fn project_count(owner_id: &str, status: &str) -> String {
    format!("{}:count:{}:{}", PROJECT_NAMESPACE, owner_id, status)
}

pub fn session(owner_id: &str, session_id: &str) -> String {
    format!("{}:session:{}:{}", PROJECT_NAMESPACE, owner_id, session_id)
}

/// Fixed per-owner aggregate.
pub fn owner_stats(owner_id: &str) -> String {
    format!("{}:owner-stats:{}", PROJECT_NAMESPACE, owner_id)
}

pub fn list_pattern(owner_id: &str) -> String {
    format!("{}:list:{}:*", PROJECT_NAMESPACE, owner_id)
}

pub fn count_pattern(owner_id: &str) -> String {
    format!("{}:count:{}:*", PROJECT_NAMESPACE, owner_id)
}

pub fn session_pattern(owner_id: &str) -> String {
    format!("{}:session:{}:*", PROJECT_NAMESPACE, owner_id)
}

pub fn lock(resource_name: &str, scope_id: &str) -> String {
    format!("{}:{}:{}", LOCK_NAMESPACE, resource_name, scope_id)
}

/// True for keys in the lock namespace.
pub fn is_lock_key(key: &str) -> bool {
    key.strip_prefix(LOCK_NAMESPACE)
        .is_some_and(|rest| rest.starts_with(':'))
}
