//! Cache store for lookup results.
//!
//! The `LookupCache` trait is the narrow interface the reader needs from an
//! external cache: string keys, byte values, per-entry TTL. The in-process
//! `MemoryLookupCache` wraps `moka::sync::Cache` with size-bounded eviction.

use std::time::{Duration, Instant};

use moka::sync::Cache as MokaCache;
use moka::Expiry;

use super::error::LookupError;

/// Key-value store with per-entry time-to-live.
pub trait LookupCache: Send + Sync {
    /// Retrieve a value, `None` if absent or expired.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, LookupError>;

    /// Store a value that expires after `ttl`.
    fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), LookupError>;

    /// Returns true if a live entry exists for `key`.
    fn has(&self, key: &str) -> Result<bool, LookupError> {
        Ok(self.get(key)?.is_some())
    }
}

#[derive(Clone)]
struct Entry {
    bytes: Vec<u8>,
    ttl: Duration,
}

struct EntryTtl;

impl Expiry<String, Entry> for EntryTtl {
    fn expire_after_create(&self, _key: &String, value: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-memory cache provider using moka.
pub struct MemoryLookupCache {
    cache: MokaCache<String, Entry>,
}

impl MemoryLookupCache {
    /// Create a cache holding at most `max_size_bytes` of values.
    pub fn new(max_size_bytes: u64) -> Self {
        let cache = MokaCache::builder()
            // Weight each entry by its data size
            .weigher(|_key: &String, value: &Entry| -> u32 {
                value.bytes.len().min(u32::MAX as usize) as u32
            })
            .max_capacity(max_size_bytes)
            .expire_after(EntryTtl)
            .build();

        Self { cache }
    }

    /// Number of live entries (approximate).
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for MemoryLookupCache {
    fn default() -> Self {
        // 64 MB
        Self::new(64 * 1024 * 1024)
    }
}

impl LookupCache for MemoryLookupCache {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, LookupError> {
        Ok(self.cache.get(key).map(|entry| entry.bytes))
    }

    fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), LookupError> {
        self.cache.insert(key.to_string(), Entry { bytes: value, ttl });
        Ok(())
    }

    fn has(&self, key: &str) -> Result<bool, LookupError> {
        Ok(self.cache.contains_key(key))
    }
}
