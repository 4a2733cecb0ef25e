//! Cache Store Module
//!
//! Expiring key-value cache whose whole mapping is persisted as one JSON blob
//! in a durable store and reloaded at construction.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::entry::current_timestamp_ms;
use crate::cache::{CacheEntry, CacheStats};
use crate::config::DEFAULT_STORAGE_KEY;
use crate::error::{CacheError, Result};
use crate::storage::{DurableStore, MemoryStore};

// == Persistence Outcome ==
/// Whether a mutation reached durable storage.
///
/// A failed durable write never fails the mutation itself: the in-memory
/// mapping is updated either way and the failure is logged and counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Persistence {
    /// The mapping was written to durable storage
    Durable,
    /// The durable write failed, the change lives in memory only
    MemoryOnly,
}

impl Persistence {
    pub fn is_durable(self) -> bool {
        self == Persistence::Durable
    }
}

// == Entry Info ==
/// Inspection view of one cached key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryInfo {
    pub key: String,
    pub written_at: Option<DateTime<Utc>>,
    /// Remaining freshness in milliseconds, 0 for stale entries awaiting removal
    pub expires_in_ms: u64,
}

// == Expiring Cache ==
/// Response cache with per-entry time-to-live and durable persistence.
///
/// Staleness is checked lazily: `get` removes an expired entry when it is
/// read, and `cleanup_expired` removes every expired entry at once. Every
/// mutation rewrites the full mapping under `storage_key`.
#[derive(Debug)]
pub struct ExpiringCache {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Durable backing store
    storage: Box<dyn DurableStore>,
    /// Key the serialized mapping lives under in `storage`
    storage_key: String,
    /// Milliseconds after which an entry is stale
    ttl_ms: u64,
    /// Performance statistics
    stats: CacheStats,
}

impl ExpiringCache {
    // == Constructor ==
    /// Loads the cache persisted under `storage_key`.
    ///
    /// Never fails: a missing blob, a storage read error or a malformed blob
    /// all yield an empty cache.
    ///
    /// # Arguments
    /// * `storage` - Durable store holding the serialized mapping
    /// * `storage_key` - Key of the blob inside `storage`
    /// * `ttl_ms` - Milliseconds after which an entry is stale
    pub fn load(
        storage: impl DurableStore + 'static,
        storage_key: impl Into<String>,
        ttl_ms: u64,
    ) -> Self {
        let storage_key = storage_key.into();
        let entries = read_snapshot(&storage, &storage_key);
        info!(
            "Loaded {} cached entries from '{}' (ttl={}ms)",
            entries.len(),
            storage_key,
            ttl_ms
        );

        let mut stats = CacheStats::new();
        stats.set_total_entries(entries.len());

        Self {
            entries,
            storage: Box::new(storage),
            storage_key,
            ttl_ms,
            stats,
        }
    }

    /// Creates an empty cache backed by a private in-memory store.
    pub fn in_memory(ttl_ms: u64) -> Self {
        Self::load(MemoryStore::new(), DEFAULT_STORAGE_KEY, ttl_ms)
    }

    // == Get ==
    /// Retrieves the value cached under `key` if it is still fresh.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        self.get_at(key, current_timestamp_ms())
    }

    /// Retrieves the value cached under `key` as seen at time `now` (Unix ms).
    ///
    /// An expired entry is removed and the mapping persisted before the miss
    /// is reported.
    pub fn get_at(&mut self, key: &str, now: u64) -> Option<Value> {
        if let Some(entry) = self.entries.get(key) {
            if entry.is_expired_at(now, self.ttl_ms) {
                debug!("Cache entry '{}' expired after {}ms", key, entry.age_ms(now));
                self.entries.remove(key);
                self.stats.record_expirations(1);
                self.stats.record_miss();
                self.stats.set_total_entries(self.entries.len());
                self.persist();
                return None;
            }

            debug!("Cache hit for '{}'", key);
            let value = entry.data.clone();
            self.stats.record_hit();
            Some(value)
        } else {
            debug!("Cache miss for '{}'", key);
            self.stats.record_miss();
            None
        }
    }

    /// Retrieves a fresh value and decodes it into `T`.
    ///
    /// A value that does not decode is reported as a miss and left in place.
    pub fn get_as<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                debug!("Cached value for '{}' has unexpected shape: {}", key, e);
                None
            }
        }
    }

    // == Set ==
    /// Stores `value` under `key`, replacing any previous entry and
    /// restarting its freshness window.
    ///
    /// Fails only if `value` cannot be represented as JSON, in which case the
    /// cache is left untouched.
    pub fn set<T: Serialize + ?Sized>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<Persistence> {
        self.set_at(key, value, current_timestamp_ms())
    }

    /// Stores `value` under `key` with write time `now` (Unix ms).
    pub fn set_at<T: Serialize + ?Sized>(
        &mut self,
        key: impl Into<String>,
        value: &T,
        now: u64,
    ) -> Result<Persistence> {
        let data = serde_json::to_value(value)?;
        let key = key.into();
        debug!("Caching '{}'", key);

        self.entries.insert(key, CacheEntry::new(data, now));
        self.stats.set_total_entries(self.entries.len());

        Ok(self.persist())
    }

    // == Delete ==
    /// Removes the entry stored under `key`, fresh or not.
    pub fn delete(&mut self, key: &str) -> Result<Persistence> {
        if self.entries.remove(key).is_none() {
            return Err(CacheError::NotFound(key.to_string()));
        }
        self.stats.set_total_entries(self.entries.len());
        Ok(self.persist())
    }

    // == Clear ==
    /// Drops every entry and removes the blob from durable storage.
    pub fn clear(&mut self) -> Persistence {
        self.entries.clear();
        self.stats.set_total_entries(0);

        match self.storage.remove(&self.storage_key) {
            Ok(()) => Persistence::Durable,
            Err(e) => {
                warn!("Failed to remove cache blob '{}': {}", self.storage_key, e);
                self.stats.record_persist_failure();
                Persistence::MemoryOnly
            }
        }
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        self.cleanup_expired_at(current_timestamp_ms())
    }

    /// Removes all entries stale at time `now`, persisting once if any were removed.
    pub fn cleanup_expired_at(&mut self, now: u64) -> usize {
        let ttl_ms = self.ttl_ms;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| !entry.is_expired_at(now, ttl_ms));

        let removed = before - self.entries.len();
        if removed > 0 {
            self.stats.record_expirations(removed);
            self.stats.set_total_entries(self.entries.len());
            self.persist();
        }
        removed
    }

    // == Persist ==
    /// Writes the full mapping to durable storage.
    ///
    /// Failures are logged and counted, never propagated.
    pub fn persist(&mut self) -> Persistence {
        let blob = match serde_json::to_string(&self.entries) {
            Ok(blob) => blob,
            Err(e) => {
                warn!("Failed to serialize cache '{}': {}", self.storage_key, e);
                self.stats.record_persist_failure();
                return Persistence::MemoryOnly;
            }
        };

        match self.storage.write(&self.storage_key, &blob) {
            Ok(()) => Persistence::Durable,
            Err(e) => {
                warn!(
                    "Failed to persist cache '{}', continuing in memory: {}",
                    self.storage_key, e
                );
                self.stats.record_persist_failure();
                Persistence::MemoryOnly
            }
        }
    }

    // == Inspection ==
    /// Returns true if `key` holds an entry still fresh at `now`.
    ///
    /// Unlike `get_at` this neither removes stale entries nor touches stats.
    pub fn contains_fresh_at(&self, key: &str, now: u64) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired_at(now, self.ttl_ms))
    }

    /// Returns all stored keys in sorted order, stale ones included.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Describes every stored entry as seen at `now`, sorted by key.
    pub fn entries_at(&self, now: u64) -> Vec<EntryInfo> {
        let mut infos: Vec<EntryInfo> = self
            .entries
            .iter()
            .map(|(key, entry)| EntryInfo {
                key: key.clone(),
                written_at: entry.written_at(),
                expires_in_ms: entry.ttl_remaining_ms(now, self.ttl_ms),
            })
            .collect();
        infos.sort_by(|a, b| a.key.cmp(&b.key));
        infos
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    pub fn ttl_ms(&self) -> u64 {
        self.ttl_ms
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Returns the current number of entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reads and decodes the persisted mapping, falling back to an empty one.
///
/// Records that do not decode as `{data, timestamp}` are dropped one by one;
/// the rest of the blob is kept.
fn read_snapshot(storage: &dyn DurableStore, storage_key: &str) -> HashMap<String, CacheEntry> {
    let blob = match storage.read(storage_key) {
        Ok(Some(blob)) => blob,
        Ok(None) => return HashMap::new(),
        Err(e) => {
            warn!("Failed to read cache '{}', starting empty: {}", storage_key, e);
            return HashMap::new();
        }
    };

    let raw: HashMap<String, Value> = match serde_json::from_str(&blob) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Discarding malformed cache '{}': {}", storage_key, e);
            return HashMap::new();
        }
    };

    raw.into_iter()
        .filter_map(|(key, record)| match serde_json::from_value(record) {
            Ok(entry) => Some((key, entry)),
            Err(e) => {
                warn!("Dropping malformed cache record '{}': {}", key, e);
                None
            }
        })
        .collect()
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    const TTL: u64 = 300_000;
    const KEY: &str = "stockCache";

    fn create_test_cache() -> (ExpiringCache, MemoryStore) {
        let storage = MemoryStore::new();
        let cache = ExpiringCache::load(storage.clone(), KEY, TTL);
        (cache, storage)
    }

    fn persisted(storage: &MemoryStore) -> Value {
        serde_json::from_str(&storage.blob(KEY).expect("blob should exist")).unwrap()
    }

    #[test]
    fn test_new_cache_is_empty() {
        let (cache, _) = create_test_cache();
        assert!(cache.is_empty());
        assert_eq!(cache.ttl_ms(), TTL);
        assert_eq!(cache.storage_key(), KEY);
    }

    #[test]
    fn test_get_unset_key() {
        let (mut cache, _) = create_test_cache();
        assert!(cache.get("stock/aapl/technical").is_none());
    }

    #[test]
    fn test_set_and_get() {
        let (mut cache, _) = create_test_cache();

        let persistence = cache.set("stock/aapl/technical", &json!({"score": 7})).unwrap();

        assert_eq!(persistence, Persistence::Durable);
        assert_eq!(cache.get("stock/aapl/technical"), Some(json!({"score": 7})));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expiry_scenario() {
        let (mut cache, storage) = create_test_cache();

        cache.set_at("AAPL:technical", &json!({"score": 7}), 0).unwrap();

        assert_eq!(cache.get_at("AAPL:technical", 299_999), Some(json!({"score": 7})));
        assert!(cache.get_at("AAPL:technical", 300_001).is_none());

        // Removed from the persisted blob, not just from memory
        assert!(persisted(&storage).get("AAPL:technical").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_get_at_exact_ttl_is_miss() {
        let (mut cache, _) = create_test_cache();

        cache.set_at("k", &1, 1_000).unwrap();
        assert!(cache.get_at("k", 1_000 + TTL).is_none());
    }

    #[test]
    fn test_expired_entry_not_resurrected_by_reload() {
        let (mut cache, storage) = create_test_cache();

        cache.set_at("k", &"v", 0).unwrap();
        assert!(cache.get_at("k", TTL + 1).is_none());

        let mut reloaded = ExpiringCache::load(storage, KEY, TTL);
        assert!(reloaded.is_empty());
        assert!(reloaded.get_at("k", 1).is_none());
    }

    #[test]
    fn test_overwrite_resets_window() {
        let (mut cache, _) = create_test_cache();

        cache.set_at("k", &"v1", 0).unwrap();
        cache.set_at("k", &"v2", 200_000).unwrap();

        // Past the first write's window but within the second's
        assert_eq!(cache.get_at("k", 400_000), Some(json!("v2")));
        assert!(cache.get_at("k", 500_000).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_reload_round_trip() {
        let (mut cache, storage) = create_test_cache();

        cache.set("stock/aapl/technical", &json!({"score": 7})).unwrap();
        cache.set("sp500-realtime", &json!([1.5, 2.5])).unwrap();

        let mut reloaded = ExpiringCache::load(storage, KEY, TTL);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("stock/aapl/technical"), Some(json!({"score": 7})));
        assert_eq!(reloaded.get("sp500-realtime"), Some(json!([1.5, 2.5])));
    }

    #[test]
    fn test_persisted_format() {
        let (mut cache, storage) = create_test_cache();

        cache.set_at("AAPL:technical", &json!({"score": 7}), 1234).unwrap();

        assert_eq!(
            persisted(&storage),
            json!({"AAPL:technical": {"data": {"score": 7}, "timestamp": 1234}})
        );
    }

    #[test]
    fn test_loads_blob_written_elsewhere() {
        let storage = MemoryStore::new();
        storage
            .write(KEY, r#"{"sp500-realtime":{"data":{"price":5000},"timestamp":100}}"#)
            .unwrap();

        let mut cache = ExpiringCache::load(storage, KEY, TTL);
        assert_eq!(cache.get_at("sp500-realtime", 200), Some(json!({"price": 5000})));
    }

    #[test]
    fn test_malformed_blob_loads_empty() {
        let storage = MemoryStore::new();
        storage.write(KEY, "{not json").unwrap();

        let cache = ExpiringCache::load(storage, KEY, TTL);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_malformed_record_drops_only_that_record() {
        let storage = MemoryStore::new();
        storage
            .write(
                KEY,
                r#"{"good":{"data":[1,2],"timestamp":100},"bad":{"timestamp":1},"worse":7}"#,
            )
            .unwrap();

        let mut cache = ExpiringCache::load(storage, KEY, TTL);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_at("good", 200), Some(json!([1, 2])));
        assert!(!cache.contains_fresh_at("bad", 200));
    }

    #[test]
    fn test_write_failure_is_fail_open() {
        let (mut cache, storage) = create_test_cache();
        storage.set_fail_writes(true);

        let persistence = cache.set("k", &"v").unwrap();

        assert_eq!(persistence, Persistence::MemoryOnly);
        assert!(!persistence.is_durable());
        assert_eq!(cache.get("k"), Some(json!("v")));
        assert_eq!(cache.stats().persist_failures, 1);
        assert!(storage.blob(KEY).is_none());
    }

    #[test]
    fn test_write_failure_on_expiry_still_misses() {
        let (mut cache, storage) = create_test_cache();
        cache.set_at("k", &"v", 0).unwrap();
        storage.set_fail_writes(true);

        assert!(cache.get_at("k", TTL).is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.stats().persist_failures, 1);
    }

    #[test]
    fn test_unserializable_value_fails_loudly() {
        let (mut cache, storage) = create_test_cache();
        let mut bad = HashMap::new();
        bad.insert(vec![1u8], "non-string map key");

        let result = cache.set("k", &bad);

        assert!(matches!(result, Err(CacheError::Serialization(_))));
        assert!(cache.is_empty());
        assert!(storage.blob(KEY).is_none());
    }

    #[test]
    fn test_get_as() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Signal {
            score: i32,
        }

        let (mut cache, _) = create_test_cache();
        cache.set("k", &Signal { score: 7 }).unwrap();

        assert_eq!(cache.get_as::<Signal>("k"), Some(Signal { score: 7 }));
        assert_eq!(cache.get_as::<Vec<String>>("k"), None);
        // Shape mismatch does not evict
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_delete() {
        let (mut cache, storage) = create_test_cache();

        cache.set("k", &1).unwrap();
        cache.delete("k").unwrap();

        assert!(cache.is_empty());
        assert_eq!(persisted(&storage), json!({}));
        assert!(matches!(cache.delete("k"), Err(CacheError::NotFound(_))));
    }

    #[test]
    fn test_clear_removes_blob() {
        let (mut cache, storage) = create_test_cache();

        cache.set("a", &1).unwrap();
        cache.set("b", &2).unwrap();

        assert_eq!(cache.clear(), Persistence::Durable);
        assert!(cache.is_empty());
        assert!(storage.blob(KEY).is_none());
    }

    #[test]
    fn test_cleanup_expired() {
        let (mut cache, storage) = create_test_cache();

        cache.set_at("old", &1, 0).unwrap();
        cache.set_at("new", &2, 200_000).unwrap();

        assert_eq!(cache.cleanup_expired_at(TTL + 1), 1);
        assert_eq!(cache.keys(), vec!["new".to_string()]);
        assert!(persisted(&storage).get("old").is_none());
        assert_eq!(cache.stats().expirations, 1);

        // Nothing more to remove
        assert_eq!(cache.cleanup_expired_at(TTL + 1), 0);
    }

    #[test]
    fn test_stale_entry_lingers_until_read() {
        let (mut cache, _) = create_test_cache();

        cache.set_at("k", &1, 0).unwrap();

        assert!(!cache.contains_fresh_at("k", TTL));
        assert_eq!(cache.len(), 1);
        assert!(cache.get_at("k", TTL).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_entries_at() {
        let (mut cache, _) = create_test_cache();

        cache.set_at("b", &1, 100_000).unwrap();
        cache.set_at("a", &2, 0).unwrap();

        let infos = cache.entries_at(250_000);
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].key, "a");
        assert_eq!(infos[0].expires_in_ms, 50_000);
        assert_eq!(infos[1].key, "b");
        assert_eq!(infos[1].expires_in_ms, 150_000);
    }

    #[test]
    fn test_stats() {
        let (mut cache, _) = create_test_cache();

        cache.set_at("k", &1, 0).unwrap();
        cache.get_at("k", 1); // hit
        cache.get_at("missing", 1); // miss
        cache.get_at("k", TTL); // expired miss

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.total_entries, 0);
    }
}
