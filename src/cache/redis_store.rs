//! Redis-backed listing cache.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;
use tracing::debug;

use super::store::{CacheError, ListingCache};

const SCAN_BATCH: usize = 200;

/// Connection settings for [`RedisListingCache`].
#[derive(Debug, Clone)]
pub struct RedisCacheConfig {
    /// Redis connection URL (e.g. `redis://127.0.0.1:6379`).
    pub url: String,
    /// Number of connections in the pool.
    pub pool_size: usize,
    /// Timeout for acquiring a pooled connection.
    pub connection_timeout: Duration,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: String::from("redis://127.0.0.1:6379"),
            pool_size: 8,
            connection_timeout: Duration::from_secs(5),
        }
    }
}

/// Listing cache stored as plain Redis strings with no TTL.
///
/// Prefix invalidation walks the keyspace with `SCAN MATCH <prefix>*` and
/// deletes each batch as it is found.
pub struct RedisListingCache {
    pool: Pool,
}

impl RedisListingCache {
    /// Build the connection pool. No connection is opened until first use.
    pub fn new(config: &RedisCacheConfig) -> Result<Self, CacheError> {
        let pool = Config::from_url(&config.url)
            .builder()
            .map(|builder| {
                builder
                    .max_size(config.pool_size)
                    .wait_timeout(Some(config.connection_timeout))
                    .runtime(Runtime::Tokio1)
                    .build()
            })
            .map_err(|err| CacheError::Connection(err.to_string()))?
            .map_err(|err| CacheError::Connection(err.to_string()))?;

        Ok(Self { pool })
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|err| CacheError::Connection(err.to_string()))
    }
}

#[async_trait]
impl ListingCache for RedisListingCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn().await?;
        let value: Option<String> = conn
            .get(key)
            .await
            .map_err(|err| CacheError::Backend(err.to_string()))?;
        Ok(value)
    }

    async fn put(&self, key: &str, payload: &str) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        let _: () = conn
            .set(key, payload)
            .await
            .map_err(|err| CacheError::Backend(err.to_string()))?;
        Ok(())
    }

    async fn invalidate_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        let pattern = format!("{}*", escape_glob(prefix));
        let mut conn = self.conn().await?;
        let mut cursor = 0u64;
        let mut removed = 0u64;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(|err| CacheError::Backend(err.to_string()))?;

            if !keys.is_empty() {
                let deleted: u64 = redis::cmd("DEL")
                    .arg(&keys)
                    .query_async(&mut conn)
                    .await
                    .map_err(|err| CacheError::Backend(err.to_string()))?;
                removed += deleted;
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        debug!(prefix, removed, "swept listing keys from redis");
        Ok(removed)
    }
}

/// Escape Redis glob metacharacters so the prefix is matched literally.
fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for ch in prefix.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_glob_leaves_plain_prefix_alone() {
        assert_eq!(escape_glob("newslist:"), "newslist:");
    }

    #[test]
    fn escape_glob_escapes_metacharacters() {
        assert_eq!(escape_glob("a*b?[c]\\"), "a\\*b\\?\\[c\\]\\\\");
    }

    #[test]
    fn default_config_points_at_localhost() {
        let config = RedisCacheConfig::default();
        assert_eq!(config.url, "redis://127.0.0.1:6379");
        assert_eq!(config.pool_size, 8);
        assert_eq!(config.connection_timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn pool_creation_is_lazy() {
        let cache = RedisListingCache::new(&RedisCacheConfig::default());
        assert!(cache.is_ok());
    }
}
