use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument};

use depot_blob::{BlobError, BlobListing, ObjectStore};
use depot_core::BlobKey;

use crate::config::S3Config;
use crate::error::classify_sdk_error;

/// [`ObjectStore`] backed by Amazon S3 or an S3-compatible service.
pub struct S3ObjectStore {
    config: S3Config,
    client: aws_sdk_s3::Client,
}

impl std::fmt::Debug for S3ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3ObjectStore")
            .field("config", &self.config)
            .field("client", &"<S3Client>")
            .finish()
    }
}

impl S3ObjectStore {
    /// Create a new store, building an SDK client from the environment
    /// credential chain.
    pub async fn new(config: S3Config) -> Self {
        let mut loader =
            aws_config::from_env().region(aws_config::Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint_url {
            debug!(endpoint = %endpoint, "using custom S3 endpoint");
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.force_path_style)
            .build();
        let client = aws_sdk_s3::Client::from_conf(s3_config);
        Self { config, client }
    }

    /// Create a store with a pre-built client (for testing).
    pub fn with_client(config: S3Config, client: aws_sdk_s3::Client) -> Self {
        Self { config, client }
    }

    /// Verify the bucket is reachable.
    pub async fn health_check(&self) -> Result<(), BlobError> {
        self.client
            .head_bucket()
            .bucket(&self.config.bucket)
            .send()
            .await
            .map_err(|e| {
                error!(error = %DisplayErrorContext(&e), "S3 health check failed");
                BlobError::Connection(format!(
                    "S3 health check failed: {}",
                    DisplayErrorContext(&e)
                ))
            })?;
        info!(bucket = %self.config.bucket, "S3 health check passed");
        Ok(())
    }
}

fn to_chrono(ts: &aws_sdk_s3::primitives::DateTime) -> DateTime<Utc> {
    DateTime::from_timestamp(ts.secs(), ts.subsec_nanos()).unwrap_or_default()
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self, data), fields(bucket = %self.config.bucket, size = data.len()))]
    async fn put(&self, key: &BlobKey, data: Bytes, content_type: &str) -> Result<(), BlobError> {
        let object_key = self.config.object_key(key.as_str());
        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&object_key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| {
                let err_str = DisplayErrorContext(&e).to_string();
                error!(key = %object_key, error = %err_str, "S3 put_object failed");
                classify_sdk_error(&err_str)
            })?;
        debug!(key = %object_key, "S3 object uploaded");
        Ok(())
    }

    #[instrument(skip(self), fields(bucket = %self.config.bucket))]
    async fn get(&self, key: &BlobKey) -> Result<Bytes, BlobError> {
        let object_key = self.config.object_key(key.as_str());
        let output = self
            .client
            .get_object()
            .bucket(&self.config.bucket)
            .key(&object_key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    return BlobError::NotFound(key.to_string());
                }
                let err_str = DisplayErrorContext(&e).to_string();
                error!(key = %object_key, error = %err_str, "S3 get_object failed");
                classify_sdk_error(&err_str)
            })?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| BlobError::Storage(format!("failed to read S3 body: {e}")))?
            .into_bytes();
        Ok(body)
    }

    #[instrument(skip(self), fields(bucket = %self.config.bucket))]
    async fn delete(&self, key: &BlobKey) -> Result<bool, BlobError> {
        let object_key = self.config.object_key(key.as_str());

        // DeleteObject succeeds for absent keys, so probe first to report existence.
        let exists = match self
            .client
            .head_object()
            .bucket(&self.config.bucket)
            .key(&object_key)
            .send()
            .await
        {
            Ok(_) => true,
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => false,
            Err(e) => {
                let err_str = DisplayErrorContext(&e).to_string();
                error!(key = %object_key, error = %err_str, "S3 head_object failed");
                return Err(classify_sdk_error(&err_str));
            }
        };
        if !exists {
            return Ok(false);
        }

        self.client
            .delete_object()
            .bucket(&self.config.bucket)
            .key(&object_key)
            .send()
            .await
            .map_err(|e| {
                let err_str = DisplayErrorContext(&e).to_string();
                error!(key = %object_key, error = %err_str, "S3 delete_object failed");
                classify_sdk_error(&err_str)
            })?;
        debug!(key = %object_key, "S3 object deleted");
        Ok(true)
    }

    #[instrument(skip(self), fields(bucket = %self.config.bucket))]
    async fn list(&self, prefix: &str) -> Result<Vec<BlobListing>, BlobError> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.config.bucket)
            .prefix(self.config.object_key(prefix))
            .into_paginator()
            .send();

        let mut listed = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| {
                let err_str = DisplayErrorContext(&e).to_string();
                error!(error = %err_str, "S3 list_objects_v2 failed");
                classify_sdk_error(&err_str)
            })?;
            for object in page.contents() {
                let Some(key) = object.key().and_then(|k| self.config.strip_prefix(k)) else {
                    continue;
                };
                listed.push(BlobListing {
                    key: BlobKey::new(key),
                    size_bytes: object
                        .size()
                        .and_then(|s| u64::try_from(s).ok())
                        .unwrap_or(0),
                    last_modified: object.last_modified().map(to_chrono).unwrap_or_default(),
                });
            }
        }
        debug!(count = listed.len(), "S3 listing complete");
        Ok(listed)
    }
}

#[cfg(all(test, feature = "integration"))]
mod integration_tests {
    use depot_blob::testing::run_object_store_conformance_tests;

    use super::*;

    // Requires an S3-compatible endpoint, e.g. `docker run -p 9000:9000 minio/minio server /data`
    // with a pre-created `depot-test` bucket and credentials in the environment.
    #[tokio::test]
    async fn conformance() {
        let endpoint =
            std::env::var("DEPOT_S3_ENDPOINT").unwrap_or_else(|_| "http://localhost:9000".into());
        let config = S3Config::new("us-east-1", "depot-test")
            .with_prefix("conformance/")
            .with_endpoint_url(endpoint);
        let store = S3ObjectStore::new(config).await;
        run_object_store_conformance_tests(&store)
            .await
            .expect("conformance tests should pass");
    }
}
