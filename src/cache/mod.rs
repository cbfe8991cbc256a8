//! Listing cache.
//!
//! Article listings are cached aside the relational store:
//!
//! - [`KeyBuilder`] turns a [`ListingQuery`](crate::application::listing::ListingQuery)
//!   into a deterministic key under the listing namespace.
//! - [`ListingCache`] stores serialized listings and supports prefix sweeps;
//!   backends are in-memory LRU, Redis, or disabled.
//!
//! The cache is advisory. Readers fall back to the store on any cache failure
//! and every article mutation sweeps the whole namespace.

mod config;
mod keys;
mod lock;
mod redis_store;
mod store;

pub use config::{CacheBackend, CacheConfig};
pub use keys::{KeyBuilder, LISTING_NAMESPACE};
pub use redis_store::{RedisCacheConfig, RedisListingCache};
pub use store::{CacheError, DisabledListingCache, ListingCache, MemoryListingCache};
