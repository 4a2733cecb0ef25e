//! Response DTOs for the cache API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::{CacheStats, EntryInfo, Persistence};

/// Response body for a cache read (GET /cache?key=...)
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The cached payload
    pub data: Value,
}

impl GetResponse {
    /// Creates a new GetResponse
    pub fn new(key: impl Into<String>, data: Value) -> Self {
        Self {
            key: key.into(),
            data,
        }
    }
}

/// Response body for a cache write (PUT /cache)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
    /// Whether the write reached durable storage or lives in memory only
    pub persistence: Persistence,
}

impl SetResponse {
    /// Creates a new SetResponse
    pub fn new(key: impl Into<String>, persistence: Persistence) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' cached", key),
            key,
            persistence,
        }
    }
}

/// Response body for a cache delete (DELETE /cache?key=...)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    /// The key that was deleted
    pub key: String,
}

impl DeleteResponse {
    /// Creates a new DeleteResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
        }
    }
}

/// Response body for clearing the cache (DELETE /keys)
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    /// Number of entries dropped
    pub removed: usize,
    pub persistence: Persistence,
}

/// Response body for the key listing (GET /keys)
#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    pub count: usize,
    pub entries: Vec<EntryInfo>,
}

impl KeysResponse {
    pub fn new(entries: Vec<EntryInfo>) -> Self {
        Self {
            count: entries.len(),
            entries,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Number of reads served from the cache
    pub hits: u64,
    /// Number of reads that found nothing fresh
    pub misses: u64,
    /// Number of entries removed as stale
    pub expirations: u64,
    /// Number of durable writes that failed
    pub persist_failures: u64,
    /// Current number of entries in cache
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Configured time-to-live in milliseconds
    pub ttl_ms: u64,
}

impl StatsResponse {
    /// Creates a new StatsResponse from cache statistics
    pub fn new(stats: &CacheStats, ttl_ms: u64) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            expirations: stats.expirations,
            persist_failures: stats.persist_failures,
            total_entries: stats.total_entries,
            hit_rate: stats.hit_rate(),
            ttl_ms,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
