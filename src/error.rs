//! Error types for the cache service
//!
//! Provides unified error handling using thiserror. None of these cross the
//! public `CacheService` boundary; they are logged and mapped to each
//! operation's failure value there.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the codec, key validator and store connectors.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key or pattern failed validation
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Expiry outside what the store accepts
    #[error("Invalid TTL: {0}")]
    InvalidTtl(String),

    /// Value has no canonical JSON representation
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Stored payload could not be decoded into the requested type
    #[error("Deserialization failed: {0}")]
    Deserialization(String),

    /// Store unreachable, timed out or replied with a protocol error
    #[error("Store connectivity error: {0}")]
    Connectivity(String),

    /// Connector does not know how to run the given script
    #[error("Unsupported script: {0}")]
    UnsupportedScript(String),

    /// Invalid construction parameters
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl CacheError {
    /// Short label used as the `kind` field in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            CacheError::InvalidKey(_) | CacheError::InvalidTtl(_) => "validation",
            CacheError::Serialization(_) => "serialization",
            CacheError::Deserialization(_) => "deserialization",
            CacheError::Connectivity(_) => "connectivity",
            CacheError::UnsupportedScript(_) => "script",
            CacheError::Config(_) => "config",
        }
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Connectivity(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for CacheError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        CacheError::Connectivity("operation timed out".to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache service.
pub type Result<T> = std::result::Result<T, CacheError>;
