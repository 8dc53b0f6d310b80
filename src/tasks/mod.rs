//! Background Tasks Module
//!
//! Contains background tasks that run periodically while the service is up.
//!
//! # Tasks
//! - Expiry Sweep: Purges expired entries from the in-memory connector

mod sweeper;

pub use sweeper::spawn_sweeper_task;
