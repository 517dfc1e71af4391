use std::time::Duration;

use depot_core::CacheKey;

/// Connection settings for [`RedisCache`](crate::RedisCache).
///
/// The cache only accelerates record reads, so pool waits are kept short: a
/// read that cannot get a connection quickly falls back to the metadata store.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g. `redis://127.0.0.1:6379`).
    pub url: String,

    /// Namespace prepended to every cache key, so several depot deployments
    /// can share one Redis instance.
    pub prefix: String,

    /// Maximum pooled connections.
    pub pool_size: usize,

    /// How long a cache call waits for a free pooled connection.
    pub connection_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: String::from("redis://127.0.0.1:6379"),
            prefix: String::from("depot"),
            pool_size: 16,
            connection_timeout: Duration::from_millis(500),
        }
    }
}

impl RedisConfig {
    /// Default settings pointed at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Redis key for a cache key, e.g. `depot:file:<id>`.
    pub(crate) fn redis_key(&self, key: &CacheKey) -> String {
        format!("{}:{}", self.prefix, key.as_str())
    }
}

#[cfg(test)]
mod tests {
    use depot_core::FileId;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn defaults_favour_fast_fallback() {
        let cfg = RedisConfig::default();
        assert_eq!(cfg.url, "redis://127.0.0.1:6379");
        assert_eq!(cfg.prefix, "depot");
        assert_eq!(cfg.pool_size, 16);
        assert!(cfg.connection_timeout < Duration::from_secs(1));
    }

    #[test]
    fn keys_are_namespaced_by_prefix() {
        let id = FileId::from(Uuid::nil());
        let cfg = RedisConfig::new("redis://cache:6379").with_prefix("staging");
        assert_eq!(cfg.url, "redis://cache:6379");
        assert_eq!(
            cfg.redis_key(&CacheKey::for_file(&id)),
            "staging:file:00000000-0000-0000-0000-000000000000"
        );
    }
}
