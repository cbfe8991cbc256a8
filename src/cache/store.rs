//! Listing cache contract and its in-process backends.

use std::num::NonZeroUsize;
use std::sync::RwLock;

use async_trait::async_trait;
use lru::LruCache;
use thiserror::Error;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache connection failed: {0}")]
    Connection(String),
    #[error("cache backend error: {0}")]
    Backend(String),
    #[error("cached payload could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Cache-aside store for serialized listing results.
///
/// Entries have no expiry; they live until a prefix sweep removes them. Every
/// operation may fail, and callers treat failures as advisory: a failed read
/// is a miss, a failed write or sweep is logged and the caller carries on.
#[async_trait]
pub trait ListingCache: Send + Sync {
    /// Fetch the payload stored under `key`. A miss is `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `payload` under `key`, replacing any previous value.
    async fn put(&self, key: &str, payload: &str) -> Result<(), CacheError>;

    /// Remove every entry whose key starts with `prefix`, returning how many
    /// entries were removed.
    async fn invalidate_prefix(&self, prefix: &str) -> Result<u64, CacheError>;
}

/// Bounded in-memory listing cache with LRU eviction.
pub struct MemoryListingCache {
    entries: RwLock<LruCache<String, String>>,
}

impl MemoryListingCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ListingCache for MemoryListingCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(rw_write(&self.entries, SOURCE, "get").get(key).cloned())
    }

    async fn put(&self, key: &str, payload: &str) -> Result<(), CacheError> {
        rw_write(&self.entries, SOURCE, "put").put(key.to_string(), payload.to_string());
        Ok(())
    }

    async fn invalidate_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        let mut entries = rw_write(&self.entries, SOURCE, "invalidate_prefix");
        let doomed: Vec<String> = entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            entries.pop(key);
        }
        Ok(doomed.len() as u64)
    }
}

/// Backend used when caching is switched off: every read misses.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledListingCache;

#[async_trait]
impl ListingCache for DisabledListingCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn put(&self, _key: &str, _payload: &str) -> Result<(), CacheError> {
        Ok(())
    }

    async fn invalidate_prefix(&self, _prefix: &str) -> Result<u64, CacheError> {
        Ok(0)
    }
}
