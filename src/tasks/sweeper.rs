//! Expiry Sweeper Task
//!
//! The in-memory connector expires entries lazily on access; this task
//! reclaims entries that are never read again.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::connector::MemoryConnector;

/// Spawns a background task that periodically purges expired entries.
///
/// # Arguments
/// * `connector` - shared in-memory connector
/// * `interval_secs` - Interval in seconds between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
pub fn spawn_sweeper_task(connector: Arc<MemoryConnector>, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!(interval_secs, "starting expiry sweeper");

        loop {
            tokio::time::sleep(interval).await;

            let removed = connector.purge_expired().await;
            if removed > 0 {
                info!(removed, "expiry sweep removed entries");
            } else {
                debug!("expiry sweep found nothing to remove");
            }
        }
    })
}
