//! Backend construction from configuration.

use std::sync::Arc;

use depot_blob::ObjectStore;
use depot_cache::Cache;
use depot_lifecycle::FileLifecycle;
use depot_metadata::MetadataStore;
use tracing::info;

use crate::config::{BlobConfig, CacheConfig, DepotConfig, MetadataConfig};
use crate::error::ServerError;

/// Create an object store from configuration.
#[allow(clippy::unused_async)]
pub async fn create_object_store(config: &BlobConfig) -> Result<Arc<dyn ObjectStore>, ServerError> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(depot_blob_memory::MemoryObjectStore::new())),
        #[cfg(feature = "s3")]
        "s3" => {
            let region = config
                .region
                .clone()
                .ok_or_else(|| ServerError::Config("s3 blob backend requires a region".into()))?;
            let bucket = config
                .bucket
                .clone()
                .ok_or_else(|| ServerError::Config("s3 blob backend requires a bucket".into()))?;

            let mut s3 = depot_blob_s3::S3Config::new(region, bucket);
            if let Some(prefix) = &config.prefix {
                s3 = s3.with_prefix(prefix);
            }
            if let Some(endpoint) = &config.endpoint_url {
                s3 = s3.with_endpoint_url(endpoint);
            }
            s3.force_path_style |= config.force_path_style;

            Ok(Arc::new(depot_blob_s3::S3ObjectStore::new(s3).await))
        }
        other => Err(ServerError::Config(format!(
            "unsupported blob backend: {other}"
        ))),
    }
}

/// Create a metadata store from configuration.
///
/// SQL backends run their migrations here.
#[allow(clippy::unused_async)]
pub async fn create_metadata_store(
    config: &MetadataConfig,
) -> Result<Arc<dyn MetadataStore>, ServerError> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(
            depot_metadata_memory::MemoryMetadataStore::new(),
        )),
        #[cfg(feature = "postgres")]
        "postgres" => {
            let store = depot_metadata_postgres::PostgresMetadataStore::new(postgres_config(config))
                .await
                .map_err(|e| ServerError::Config(format!("postgres metadata store: {e}")))?;
            Ok(Arc::new(store))
        }
        other => Err(ServerError::Config(format!(
            "unsupported metadata backend: {other}"
        ))),
    }
}

#[cfg(feature = "postgres")]
fn postgres_config(config: &MetadataConfig) -> depot_metadata_postgres::PostgresConfig {
    let defaults = depot_metadata_postgres::PostgresConfig::default();
    depot_metadata_postgres::PostgresConfig {
        url: config.url.clone().unwrap_or(defaults.url),
        pool_size: config.pool_size.unwrap_or(defaults.pool_size),
        schema: config.schema.clone().unwrap_or(defaults.schema),
        table_prefix: config.table_prefix.clone().unwrap_or(defaults.table_prefix),
        ssl_mode: config.ssl_mode.clone(),
        ssl_root_cert: config.ssl_root_cert.clone(),
        ssl_cert: config.ssl_cert.clone(),
        ssl_key: config.ssl_key.clone(),
    }
}

/// Create a record cache from configuration.
#[allow(clippy::unused_async)]
pub async fn create_cache(config: &CacheConfig) -> Result<Arc<dyn Cache>, ServerError> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(depot_cache_memory::MemoryCache::new())),
        #[cfg(feature = "redis")]
        "redis" => {
            let defaults = depot_cache_redis::RedisConfig::default();
            let redis_config = depot_cache_redis::RedisConfig {
                url: config.url.clone().unwrap_or(defaults.url),
                prefix: config.prefix.clone().unwrap_or(defaults.prefix),
                pool_size: config.pool_size.unwrap_or(defaults.pool_size),
                connection_timeout: config
                    .connection_timeout_ms
                    .map_or(defaults.connection_timeout, std::time::Duration::from_millis),
            };
            let cache = depot_cache_redis::RedisCache::new(&redis_config)
                .map_err(|e| ServerError::Config(format!("redis cache: {e}")))?;
            Ok(Arc::new(cache))
        }
        other => Err(ServerError::Config(format!(
            "unsupported cache backend: {other}"
        ))),
    }
}

/// Wire all three backends into a [`FileLifecycle`].
pub async fn build_lifecycle(config: &DepotConfig) -> Result<Arc<FileLifecycle>, ServerError> {
    let lifecycle_config = config.lifecycle.to_lifecycle_config()?;
    let blobs = create_object_store(&config.blob).await?;
    let metadata = create_metadata_store(&config.metadata).await?;
    let cache = create_cache(&config.cache).await?;

    info!(
        blob = %config.blob.backend,
        metadata = %config.metadata.backend,
        cache = %config.cache.backend,
        "storage backends ready"
    );

    Ok(Arc::new(FileLifecycle::new(
        blobs,
        metadata,
        cache,
        lifecycle_config,
    )))
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use depot_core::OwnerId;
    use depot_lifecycle::UploadRequest;
    use uuid::Uuid;

    use super::*;

    #[tokio::test]
    async fn default_config_builds_in_memory_lifecycle() {
        let config = DepotConfig::default();
        let lifecycle = build_lifecycle(&config).await.unwrap();

        let owner = OwnerId::from(Uuid::new_v4());
        let record = lifecycle
            .upload(UploadRequest::new(
                owner,
                "notes.txt",
                "text/plain",
                Bytes::from_static(b"hi"),
            ))
            .await
            .unwrap();
        let (_, payload) = lifecycle.download(&owner, &record.id).await.unwrap();
        assert_eq!(payload, Bytes::from_static(b"hi"));
    }

    #[tokio::test]
    async fn zero_store_timeout_fails_before_connecting() {
        let mut config = DepotConfig::default();
        config.lifecycle.store_timeout_seconds = 0;
        assert!(matches!(
            build_lifecycle(&config).await,
            Err(ServerError::Config(_))
        ));
    }

    #[tokio::test]
    async fn unknown_backends_are_rejected() {
        let blob = BlobConfig {
            backend: "ftp".into(),
            ..BlobConfig::default()
        };
        let err = create_object_store(&blob).await.err().unwrap();
        assert!(err.to_string().contains("unsupported blob backend: ftp"));

        let metadata = MetadataConfig {
            backend: "sqlite".into(),
            ..MetadataConfig::default()
        };
        assert!(matches!(
            create_metadata_store(&metadata).await,
            Err(ServerError::Config(_))
        ));

        let cache = CacheConfig {
            backend: "memcached".into(),
            ..CacheConfig::default()
        };
        assert!(matches!(
            create_cache(&cache).await,
            Err(ServerError::Config(_))
        ));
    }

    #[cfg(feature = "s3")]
    #[tokio::test]
    async fn s3_requires_bucket() {
        let blob = BlobConfig {
            backend: "s3".into(),
            region: Some("us-east-1".into()),
            ..BlobConfig::default()
        };
        let err = create_object_store(&blob).await.err().unwrap();
        assert!(err.to_string().contains("requires a bucket"));
    }

    #[cfg(feature = "postgres")]
    #[test]
    fn postgres_config_passes_client_certificates() {
        let toml = r#"
            [metadata]
            backend = "postgres"
            ssl_mode = "verify-full"
            ssl_root_cert = "/etc/depot/ca.pem"
            ssl_cert = "/etc/depot/client.pem"
            ssl_key = "/etc/depot/client.key"
        "#;
        let config: DepotConfig = toml::from_str(toml).unwrap();
        let pg = postgres_config(&config.metadata);
        assert_eq!(pg.ssl_mode.as_deref(), Some("verify-full"));
        assert_eq!(pg.ssl_root_cert.as_deref(), Some("/etc/depot/ca.pem"));
        assert_eq!(pg.ssl_cert.as_deref(), Some("/etc/depot/client.pem"));
        assert_eq!(pg.ssl_key.as_deref(), Some("/etc/depot/client.key"));
    }

    #[cfg(feature = "postgres")]
    #[test]
    fn postgres_config_fills_defaults() {
        let config = MetadataConfig {
            backend: "postgres".into(),
            url: Some("postgres://db/files".into()),
            table_prefix: Some("app_".into()),
            ..MetadataConfig::default()
        };
        let pg = postgres_config(&config);
        assert_eq!(pg.url, "postgres://db/files");
        assert!(pg.ssl_cert.is_none());
        assert_eq!(pg.table_prefix, "app_");
        assert_eq!(pg.schema, "public");
        assert_eq!(pg.pool_size, 5);
    }
}
