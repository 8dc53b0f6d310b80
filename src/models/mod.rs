//! Value types exchanged with callers of the cache service.

pub mod batch;
pub mod snapshot;

// Re-export commonly used types
pub use batch::BatchEntry;
pub use snapshot::StatsSnapshot;
