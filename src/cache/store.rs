//! Cache storage for rendered feeds.
//!
//! The store knows nothing about feeds: keys and values are opaque. Expiry is
//! passive; an entry past its deadline reads as absent and is dropped on the
//! next access.

use std::sync::{Arc, RwLock};

use bytes::Bytes;
use lru::LruCache;
use time::OffsetDateTime;
use tracing::warn;

use crate::util::clock::Clock;

use super::config::{CacheConfig, CacheTtl};
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// Key-value storage with per-entry time-to-live.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Bytes>;

    /// Store `value` for `ttl`. A disabled TTL stores nothing.
    fn set(&self, key: &str, value: Bytes, ttl: CacheTtl);

    /// When the live entry for `key` expires.
    fn expires_at(&self, key: &str) -> Option<OffsetDateTime>;
}

#[derive(Debug, Clone)]
struct Entry {
    value: Bytes,
    expires_at: OffsetDateTime,
}

/// In-process LRU store bounded by entry count.
pub struct MemoryCacheStore {
    entries: RwLock<LruCache<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCacheStore {
    pub fn new(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.capacity_non_zero())),
            clock,
        }
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> Option<Bytes> {
        let now = self.clock.now();
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        let live = entries
            .get(key)
            .map(|entry| (entry.expires_at > now).then(|| entry.value.clone()))?;
        if live.is_none() {
            entries.pop(key);
        }
        live
    }

    fn set(&self, key: &str, value: Bytes, ttl: CacheTtl) {
        let Some(lifetime) = ttl.as_duration() else {
            return;
        };
        let Some(expires_at) = self.clock.now().checked_add(lifetime) else {
            warn!(target = SOURCE, key, "cache deadline out of range; entry not stored");
            return;
        };
        rw_write(&self.entries, SOURCE, "set").put(key.to_string(), Entry { value, expires_at });
    }

    fn expires_at(&self, key: &str) -> Option<OffsetDateTime> {
        let now = self.clock.now();
        rw_read(&self.entries, SOURCE, "expires_at")
            .peek(key)
            .map(|entry| entry.expires_at)
            .filter(|at| *at > now)
    }
}
