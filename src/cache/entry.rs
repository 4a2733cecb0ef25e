//! Cache Entry Module
//!
//! Defines the persisted shape of a single cached response.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Cache Entry ==
/// A cached response payload and the time it was written.
///
/// Serializes as `{"data": <any>, "timestamp": <epoch millis>}`, which is the
/// per-key record inside the persisted cache blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cached payload
    pub data: Value,
    /// Last write time (Unix milliseconds)
    pub timestamp: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry written at `timestamp`.
    pub fn new(data: Value, timestamp: u64) -> Self {
        Self { data, timestamp }
    }

    // == Age ==
    /// Milliseconds elapsed since the entry was written.
    ///
    /// A timestamp in the future (clock moved backwards) counts as age zero.
    pub fn age_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.timestamp)
    }

    // == Is Expired ==
    /// Checks whether the entry is stale at `now` for the given TTL.
    ///
    /// Boundary condition: the entry is stale once its age reaches the TTL,
    /// so a read exactly `ttl_ms` after the write is already a miss. A
    /// strict `age > ttl` check would still serve it at that instant.
    pub fn is_expired_at(&self, now: u64, ttl_ms: u64) -> bool {
        self.age_ms(now) >= ttl_ms
    }

    // == Time To Live ==
    /// Returns the remaining freshness window in milliseconds, 0 once stale.
    pub fn ttl_remaining_ms(&self, now: u64, ttl_ms: u64) -> u64 {
        ttl_ms.saturating_sub(self.age_ms(now))
    }

    /// Returns the write time as a UTC datetime.
    pub fn written_at(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.timestamp)
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}
