//! Expiry Sweep Task
//!
//! Background task that periodically prunes stale cache entries, so keys that
//! are never read again do not linger in the persisted blob.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::SharedCache;

/// Spawns a background task that periodically removes expired cache entries.
///
/// Each run takes the write lock, removes every stale entry and persists the
/// mapping once if anything was removed.
///
/// # Arguments
/// * `cache` - Shared cache to sweep
/// * `interval_secs` - Interval in seconds between sweeps, must be non-zero
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = cache::shared(ExpiringCache::in_memory(300_000));
/// let sweep_handle = spawn_sweep_task(cache.clone(), 60);
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task(cache: SharedCache, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!("Starting expiry sweep with interval of {} seconds", interval.as_secs());

        loop {
            tokio::time::sleep(interval).await;

            let (removed, remaining) = {
                let mut cache_guard = cache.write().await;
                let removed = cache_guard.cleanup_expired();
                (removed, cache_guard.len())
            };

            if removed > 0 {
                info!(
                    "Expiry sweep: removed {} stale entries, {} remain",
                    removed, remaining
                );
            } else {
                debug!("Expiry sweep: no stale entries found");
            }
        }
    })
}
