//! Cache Module
//!
//! Provides the expiring response cache with durable persistence.

mod entry;
mod key;
mod stats;
mod store;


use std::sync::Arc;

use tokio::sync::RwLock;

// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use key::CacheKey;
pub use stats::CacheStats;
pub use store::{EntryInfo, ExpiringCache, Persistence};

/// Cache shared between request handlers and the sweep task.
///
/// Every read-modify-write of the mapping and its persisted blob happens
/// under the write lock, so concurrent writers cannot lose each other's updates.
pub type SharedCache = Arc<RwLock<ExpiringCache>>;

/// Wraps a cache for sharing across tasks.
pub fn shared(cache: ExpiringCache) -> SharedCache {
    Arc::new(RwLock::new(cache))
}
