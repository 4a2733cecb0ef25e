//! Configuration Module
//!
//! Handles loading cache and server configuration from environment variables.

use std::env;
use std::path::PathBuf;

use crate::storage::FileStore;

/// Default time-to-live for cached responses (5 minutes).
pub const DEFAULT_TTL_MS: u64 = 5 * 60 * 1000;

/// Default storage key the cache blob is persisted under.
pub const DEFAULT_STORAGE_KEY: &str = "stockCache";

/// Cache and server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Milliseconds after which a cached entry is stale
    pub ttl_ms: u64,
    /// Directory holding the durable cache blob
    pub cache_dir: PathBuf,
    /// Key the whole cache mapping is persisted under
    pub storage_key: String,
    /// HTTP server port
    pub server_port: u16,
    /// Background sweep interval in seconds, 0 disables the sweep
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_TTL_MS` - Entry time-to-live in milliseconds (default: 300000)
    /// - `CACHE_DIR` - Directory for the durable blob (default: platform cache dir)
    /// - `CACHE_STORAGE_KEY` - Storage key of the blob (default: stockCache)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds, 0 disables (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            ttl_ms: parse_var("CACHE_TTL_MS").unwrap_or(defaults.ttl_ms),
            cache_dir: env::var("CACHE_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            storage_key: env::var("CACHE_STORAGE_KEY")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.storage_key),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_TTL_MS,
            cache_dir: FileStore::default_dir(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            server_port: 3000,
            cleanup_interval: 60,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
