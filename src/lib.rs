//! Ticker Cache - persistent expiring response cache
//!
//! Caches stock dashboard API responses under request fingerprints, expires
//! them lazily after a TTL, and persists the whole mapping as one JSON blob.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod storage;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheKey, ExpiringCache, Persistence};
pub use config::Config;
pub use tasks::spawn_sweep_task;
