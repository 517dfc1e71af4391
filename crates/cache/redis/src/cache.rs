use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use deadpool_redis::{Config, Pool, PoolError, Runtime};
use tracing::debug;

use depot_cache::{Cache, CacheError};
use depot_core::CacheKey;

use crate::config::RedisConfig;

/// Redis-backed implementation of [`Cache`].
///
/// Entries are plain Redis strings written with `SET ... PX` so Redis
/// enforces the TTL.
pub struct RedisCache {
    pool: Pool,
    config: RedisConfig,
}

impl RedisCache {
    /// Create a new `RedisCache` from the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Connection`] if the pool cannot be created.
    pub fn new(config: &RedisConfig) -> Result<Self, CacheError> {
        let cfg = Config::from_url(&config.url);
        let pool = cfg
            .builder()
            .map(|b| {
                b.max_size(config.pool_size)
                    .wait_timeout(Some(config.connection_timeout))
                    .runtime(Runtime::Tokio1)
                    .build()
            })
            .map_err(|e| CacheError::Connection(e.to_string()))?
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        Ok(Self {
            pool,
            config: config.clone(),
        })
    }

    fn redis_key(&self, key: &CacheKey) -> String {
        self.config.redis_key(key)
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection, CacheError> {
        self.pool.get().await.map_err(|e| match e {
            PoolError::Timeout(_) => CacheError::Connection(format!("pool timeout: {e}")),
            other => CacheError::Connection(other.to_string()),
        })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheError> {
        let redis_key = self.redis_key(key);
        let mut conn = self.conn().await?;

        let value: Option<Vec<u8>> = redis::cmd("GET")
            .arg(&redis_key)
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;

        Ok(value.map(Bytes::from))
    }

    async fn set(&self, key: &CacheKey, value: Bytes, ttl: Duration) -> Result<(), CacheError> {
        let redis_key = self.redis_key(key);
        // PX rejects zero, so sub-millisecond TTLs round up.
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let mut conn = self.conn().await?;

        redis::cmd("SET")
            .arg(&redis_key)
            .arg(value.as_ref())
            .arg("PX")
            .arg(ttl_ms)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;

        debug!(key = %redis_key, ttl_ms, "cache entry written");
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool, CacheError> {
        let redis_key = self.redis_key(key);
        let mut conn = self.conn().await?;

        let removed: i64 = redis::cmd("DEL")
            .arg(&redis_key)
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;

        Ok(removed > 0)
    }
}


#[cfg(all(test, feature = "integration"))]
mod integration_tests {
    use super::*;

    fn test_config() -> RedisConfig {
        RedisConfig {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            prefix: format!("depot-test-{}", uuid::Uuid::new_v4()),
            ..RedisConfig::default()
        }
    }

    #[tokio::test]
    async fn conformance() {
        let cache = RedisCache::new(&test_config()).expect("pool creation should succeed");
        depot_cache::testing::run_cache_conformance_tests(&cache)
            .await
            .expect("conformance tests should pass");
    }

    #[tokio::test]
    async fn entry_expires() {
        let cache = RedisCache::new(&test_config()).expect("pool creation should succeed");
        let key = CacheKey::for_file(&depot_core::FileId::generate());
        cache
            .set(&key, Bytes::from_static(b"short"), Duration::from_millis(50))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(cache.get(&key).await.unwrap().is_none());
    }
}
