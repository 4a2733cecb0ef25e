//! Request DTOs for the cache API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;
use serde_json::Value;

/// Request body for storing a response (PUT /cache)
///
/// # Fields
/// - `key`: Request fingerprint, e.g. `stock/aapl/graph?period=1y`; any string is accepted
/// - `data`: Response payload to cache, any JSON value
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The payload to store
    pub data: Value,
}

/// Query string selecting one cache key (GET/DELETE /cache?key=...)
///
/// Keys carry `/`, `?` and `&`, so they travel URL-encoded in the query
/// rather than as a path segment.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyQuery {
    pub key: String,
}
