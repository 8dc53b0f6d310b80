//! Cache Module
//!
//! Cache-aside service over a store connector: codec, key validation, basic
//! and batch operations, pattern invalidation, distributed locks, domain
//! invalidation recipes and health reporting.

pub mod codec;
mod health;
mod invalidation;
pub mod keys;
mod lock;
mod service;
mod stats;


// Re-export public types
pub use health::parse_info;
pub use lock::{LockToken, TokenGenerator};
pub use service::CacheService;
pub use stats::{CacheStats, StatsRecorder};
