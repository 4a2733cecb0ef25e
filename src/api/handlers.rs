//! API Handlers
//!
//! HTTP request handlers for each cache endpoint.

use axum::{
    extract::{Query, State},
    Json,
};

use crate::cache::{current_timestamp_ms, shared, ExpiringCache, SharedCache};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    ClearResponse, DeleteResponse, GetResponse, HealthResponse, KeyQuery, KeysResponse,
    SetRequest, SetResponse, StatsResponse,
};
use crate::storage::FileStore;

/// Application state shared across all handlers.
///
/// Holds the cache behind a lock; see [`SharedCache`].
#[derive(Clone)]
pub struct AppState {
    pub cache: SharedCache,
}

impl AppState {
    /// Creates a new AppState around the given cache.
    pub fn new(cache: ExpiringCache) -> Self {
        Self {
            cache: shared(cache),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Loads the cache persisted in the configured directory.
    pub fn from_config(config: &Config) -> Self {
        let storage = FileStore::new(&config.cache_dir);
        Self::new(ExpiringCache::load(
            storage,
            config.storage_key.clone(),
            config.ttl_ms,
        ))
    }
}

/// Handler for PUT /cache
///
/// Stores a response payload under its request fingerprint.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    let mut cache = state.cache.write().await;
    let persistence = cache.set(req.key.clone(), &req.data)?;

    Ok(Json(SetResponse::new(req.key, persistence)))
}

/// Handler for GET /cache?key=...
///
/// Returns the cached payload, or 404 when absent or stale.
pub async fn get_handler(
    State(state): State<AppState>,
    Query(query): Query<KeyQuery>,
) -> Result<Json<GetResponse>> {
    // Write lock: a stale hit removes the entry
    let mut cache = state.cache.write().await;
    let data = cache
        .get(&query.key)
        .ok_or_else(|| CacheError::NotFound(query.key.clone()))?;

    Ok(Json(GetResponse::new(query.key, data)))
}

/// Handler for DELETE /cache?key=...
pub async fn delete_handler(
    State(state): State<AppState>,
    Query(query): Query<KeyQuery>,
) -> Result<Json<DeleteResponse>> {
    let mut cache = state.cache.write().await;
    cache.delete(&query.key)?;

    Ok(Json(DeleteResponse::new(query.key)))
}

/// Handler for GET /keys
///
/// Lists stored keys with their remaining freshness, without pruning.
pub async fn keys_handler(State(state): State<AppState>) -> Json<KeysResponse> {
    let cache = state.cache.read().await;
    Json(KeysResponse::new(cache.entries_at(current_timestamp_ms())))
}

/// Handler for DELETE /keys
///
/// Drops every entry and the persisted blob.
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let mut cache = state.cache.write().await;
    let removed = cache.len();
    let persistence = cache.clear();

    Json(ClearResponse {
        removed,
        persistence,
    })
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache = state.cache.read().await;
    Json(StatsResponse::new(&cache.stats(), cache.ttl_ms()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
