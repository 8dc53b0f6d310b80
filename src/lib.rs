//! Projects Cache - cache-aside service and distributed locks
//!
//! Fail-open caching over Redis (or an in-process store) for the project
//! lifecycle backend, with batch and pattern operations, lock leases and
//! domain invalidation recipes.

pub mod cache;
pub mod config;
pub mod connector;
pub mod error;
pub mod models;
pub mod tasks;

pub use cache::{CacheService, LockToken};
pub use config::Config;
pub use error::CacheError;
pub use models::{BatchEntry, StatsSnapshot};
pub use tasks::spawn_sweeper_task;
