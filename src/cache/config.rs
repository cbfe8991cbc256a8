//! Listing cache configuration.

use std::num::NonZeroUsize;
use std::sync::Arc;

use super::keys::LISTING_NAMESPACE;
use super::redis_store::{RedisCacheConfig, RedisListingCache};
use super::store::{CacheError, DisabledListingCache, ListingCache, MemoryListingCache};

const DEFAULT_MEMORY_CAPACITY: usize = 256;

/// Which store backs the listing cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheBackend {
    #[default]
    Memory,
    Redis,
    Disabled,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Prefix of every listing key; mutations invalidate this whole namespace.
    pub namespace: String,
    /// Maximum entries held by the in-memory backend.
    pub memory_capacity: usize,
    pub redis: RedisCacheConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            namespace: LISTING_NAMESPACE.to_string(),
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            redis: RedisCacheConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Returns the memory capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn memory_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.memory_capacity).unwrap_or(NonZeroUsize::MIN)
    }

    /// Instantiate the configured backend.
    pub fn build(&self) -> Result<Arc<dyn ListingCache>, CacheError> {
        let cache: Arc<dyn ListingCache> = match self.backend {
            CacheBackend::Memory => {
                Arc::new(MemoryListingCache::new(self.memory_capacity_non_zero()))
            }
            CacheBackend::Redis => Arc::new(RedisListingCache::new(&self.redis)?),
            CacheBackend::Disabled => Arc::new(DisabledListingCache),
        };
        Ok(cache)
    }
}
