use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, SubsecRound, Utc};
use tracing::{debug, error, info, instrument, warn};

use depot_blob::{BlobError, ObjectStore};
use depot_cache::{Cache, CacheError};
use depot_core::{BlobKey, CacheKey, FileId, FileRecord, OwnerId, SearchFilter};
use depot_metadata::{MetadataError, MetadataStore};

use crate::config::LifecycleConfig;
use crate::error::LifecycleError;

/// Input to [`FileLifecycle::upload`].
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub owner: OwnerId,
    pub name: String,
    pub content_type: String,
    pub payload: Bytes,
    pub is_public: bool,
    /// RFC 3339 expiration timestamp. `None` means the file never expires.
    pub expires_at: Option<String>,
}

impl UploadRequest {
    pub fn new(
        owner: OwnerId,
        name: impl Into<String>,
        content_type: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            owner,
            name: name.into(),
            content_type: content_type.into(),
            payload: payload.into(),
            is_public: false,
            expires_at: None,
        }
    }

    #[must_use]
    pub fn public(mut self, is_public: bool) -> Self {
        self.is_public = is_public;
        self
    }

    #[must_use]
    pub fn expires_at(mut self, expires_at: impl Into<String>) -> Self {
        self.expires_at = Some(expires_at.into());
        self
    }
}

/// Coordinates the object store, metadata store, and cache.
///
/// The metadata store is the source of truth. Payloads are written before
/// their record and removed before (or together with) it; a record whose
/// creation fails triggers a best-effort delete of the payload. The cache
/// is only ever invalidated after a mutation, never updated in place.
///
/// No lock is held across a store call. Concurrent shares of one file resolve
/// last-writer-wins in the metadata store.
pub struct FileLifecycle {
    pub(crate) blobs: Arc<dyn ObjectStore>,
    pub(crate) metadata: Arc<dyn MetadataStore>,
    pub(crate) cache: Arc<dyn Cache>,
    pub(crate) config: LifecycleConfig,
}

impl std::fmt::Debug for FileLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLifecycle")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Current time at the precision the metadata store preserves.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn parse_expiration(value: &str) -> Result<DateTime<Utc>, LifecycleError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc).trunc_subsecs(6))
        .map_err(|e| LifecycleError::InvalidExpiration {
            value: value.to_owned(),
            reason: e.to_string(),
        })
}

impl FileLifecycle {
    pub fn new(
        blobs: Arc<dyn ObjectStore>,
        metadata: Arc<dyn MetadataStore>,
        cache: Arc<dyn Cache>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            blobs,
            metadata,
            cache,
            config,
        }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Run a store call under the configured deadline.
    pub(crate) async fn bounded<T, E>(
        &self,
        call: impl Future<Output = Result<T, E>>,
        on_timeout: impl FnOnce(Duration) -> E,
    ) -> Result<T, E> {
        let limit = self.config.store_timeout;
        tokio::time::timeout(limit, call)
            .await
            .unwrap_or_else(|_| Err(on_timeout(limit)))
    }

    fn public_url_for(&self, id: &FileId, is_public: bool) -> Option<String> {
        if !is_public {
            return None;
        }
        self.config
            .public_base_url
            .as_deref()
            .map(|base| format!("{}/{id}", base.trim_end_matches('/')))
    }

    /// Store a new file: payload first, then its record.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::InvalidExpiration`] before any store is touched.
    /// - [`LifecycleError::StorageWriteFailed`] if the payload write fails or
    ///   times out; no record is created.
    /// - [`LifecycleError::Metadata`] if the record cannot be persisted; the
    ///   payload is deleted on a best-effort basis.
    #[instrument(skip(self, request), fields(owner = %request.owner, name = %request.name))]
    pub async fn upload(&self, request: UploadRequest) -> Result<FileRecord, LifecycleError> {
        let expires_at = request
            .expires_at
            .as_deref()
            .map(parse_expiration)
            .transpose()?;

        let id = FileId::generate();
        let blob_key = BlobKey::for_file(&id);
        let size_bytes = request.payload.len() as u64;

        let put = self
            .bounded(
                self.blobs
                    .put(&blob_key, request.payload, &request.content_type),
                BlobError::Timeout,
            )
            .await;
        if let Err(e) = put {
            warn!(file_id = %id, error = %e, "payload write failed");
            // A timed-out write may still land after we give up.
            if matches!(e, BlobError::Timeout(_)) {
                self.compensate_upload(&id, &blob_key).await;
            }
            return Err(LifecycleError::StorageWriteFailed(e));
        }

        let created_at = now();
        let record = FileRecord {
            id,
            owner: request.owner,
            name: request.name,
            size_bytes,
            content_type: request.content_type,
            blob_key: blob_key.clone(),
            public_url: self.public_url_for(&id, request.is_public),
            is_public: request.is_public,
            expires_at,
            created_at,
            updated_at: created_at,
        };

        if let Err(e) = self
            .bounded(self.metadata.create(&record), MetadataError::Timeout)
            .await
        {
            error!(file_id = %id, error = %e, "record creation failed, removing payload");
            self.compensate_upload(&id, &blob_key).await;
            return Err(LifecycleError::Metadata(e));
        }

        info!(file_id = %id, size_bytes, "file uploaded");
        Ok(record)
    }

    /// Best-effort removal of a payload whose upload did not complete.
    async fn compensate_upload(&self, id: &FileId, blob_key: &BlobKey) {
        match self
            .bounded(self.blobs.delete(blob_key), BlobError::Timeout)
            .await
        {
            Ok(_) => debug!(file_id = %id, "orphaned payload removed"),
            Err(e) => error!(
                file_id = %id,
                error = %e,
                "failed to remove orphaned payload, left for sweep reconciliation"
            ),
        }
    }

    /// Load a record, enforcing ownership on both cache hits and misses.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::FileNotFound`] if no record exists,
    /// [`LifecycleError::Unauthorized`] if `caller` does not own it.
    #[instrument(skip(self), fields(caller = %caller, file_id = %id))]
    pub async fn fetch(&self, caller: &OwnerId, id: &FileId) -> Result<FileRecord, LifecycleError> {
        let cache_key = CacheKey::for_file(id);
        if let Some(record) = self.read_cache(&cache_key, id).await {
            if !record.is_owned_by(caller) {
                warn!("cached record requested by non-owner");
                return Err(LifecycleError::Unauthorized(*id));
            }
            debug!("cache hit");
            return Ok(record);
        }

        let record = self
            .bounded(self.metadata.find_by_id(id), MetadataError::Timeout)
            .await?
            .ok_or(LifecycleError::FileNotFound(*id))?;

        if !record.is_owned_by(caller) {
            warn!("record requested by non-owner");
            return Err(LifecycleError::Unauthorized(*id));
        }

        self.write_cache(&cache_key, &record).await;
        Ok(record)
    }

    /// Read and decode a cached record. Every failure is a miss.
    async fn read_cache(&self, key: &CacheKey, id: &FileId) -> Option<FileRecord> {
        let bytes = match self.bounded(self.cache.get(key), CacheError::Timeout).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %key, error = %e, "cache read failed, falling back to store");
                return None;
            }
        };

        match serde_json::from_slice::<FileRecord>(&bytes) {
            Ok(record) if record.id == *id => Some(record),
            Ok(_) | Err(_) => {
                warn!(key = %key, "discarding malformed cache entry");
                self.invalidate(key).await;
                None
            }
        }
    }

    async fn write_cache(&self, key: &CacheKey, record: &FileRecord) {
        let payload = match serde_json::to_vec(record) {
            Ok(payload) => Bytes::from(payload),
            Err(e) => {
                warn!(key = %key, error = %e, "failed to encode record for cache");
                return;
            }
        };
        if let Err(e) = self
            .bounded(
                self.cache.set(key, payload, self.config.cache_ttl),
                CacheError::Timeout,
            )
            .await
        {
            warn!(key = %key, error = %e, "cache population failed");
        }
    }

    pub(crate) async fn invalidate(&self, key: &CacheKey) {
        if let Err(e) = self
            .bounded(self.cache.delete(key), CacheError::Timeout)
            .await
        {
            warn!(key = %key, error = %e, "cache invalidation failed");
        }
    }

    /// All files owned by `owner`, in creation order.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Metadata`] if the store query fails.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn list(&self, owner: &OwnerId) -> Result<Vec<FileRecord>, LifecycleError> {
        let records = self
            .bounded(self.metadata.find_by_owner(owner), MetadataError::Timeout)
            .await?;
        Ok(records)
    }

    /// Files owned by `owner` matching every populated field of `filter`.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Metadata`] if the store query fails.
    #[instrument(skip(self, filter), fields(owner = %owner))]
    pub async fn search(
        &self,
        owner: &OwnerId,
        filter: &SearchFilter,
    ) -> Result<Vec<FileRecord>, LifecycleError> {
        if filter.is_empty() {
            return self.list(owner).await;
        }
        let records = self
            .bounded(
                self.metadata.find_filtered(owner, filter),
                MetadataError::Timeout,
            )
            .await?;
        Ok(records)
    }

    /// Make a file public and replace its expiration.
    ///
    /// `expires_at` overwrites the current expiration unconditionally; `None`
    /// clears it. Sharing is one-directional: nothing here makes a file
    /// private again.
    ///
    /// # Errors
    ///
    /// Everything [`fetch`](Self::fetch) returns, plus
    /// [`LifecycleError::InvalidExpiration`] and [`LifecycleError::Metadata`].
    #[instrument(skip(self), fields(caller = %caller, file_id = %id))]
    pub async fn share(
        &self,
        caller: &OwnerId,
        id: &FileId,
        expires_at: Option<&str>,
    ) -> Result<FileRecord, LifecycleError> {
        let expires_at = expires_at.map(parse_expiration).transpose()?;
        let mut record = self.fetch(caller, id).await?;

        record.is_public = true;
        record.expires_at = expires_at;
        record.public_url = self.public_url_for(&record.id, true);
        record.updated_at = now();

        self.bounded(self.metadata.update(&record), MetadataError::Timeout)
            .await
            .map_err(|e| match e {
                MetadataError::NotFound(id) => LifecycleError::FileNotFound(id),
                other => LifecycleError::Metadata(other),
            })?;
        self.invalidate(&record.cache_key()).await;

        info!("file shared");
        Ok(record)
    }

    /// Load a file's record together with its payload.
    ///
    /// # Errors
    ///
    /// Everything [`fetch`](Self::fetch) returns, plus
    /// [`LifecycleError::StorageReadFailed`] if the payload cannot be read.
    #[instrument(skip(self), fields(caller = %caller, file_id = %id))]
    pub async fn download(
        &self,
        caller: &OwnerId,
        id: &FileId,
    ) -> Result<(FileRecord, Bytes), LifecycleError> {
        let record = self.fetch(caller, id).await?;
        let payload = self
            .bounded(self.blobs.get(&record.blob_key), BlobError::Timeout)
            .await
            .map_err(|e| {
                error!(error = %e, "payload read failed");
                LifecycleError::StorageReadFailed(e)
            })?;
        Ok((record, payload))
    }

    /// Delete a file: payload, then record, then cache entry.
    ///
    /// A payload delete failure aborts before the record is touched so the
    /// delete can be retried. A record that is already gone yields
    /// [`LifecycleError::FileNotFound`].
    ///
    /// # Errors
    ///
    /// Everything [`fetch`](Self::fetch) returns, plus
    /// [`LifecycleError::StorageDeleteFailed`] and [`LifecycleError::Metadata`].
    #[instrument(skip(self), fields(caller = %caller, file_id = %id))]
    pub async fn delete(&self, caller: &OwnerId, id: &FileId) -> Result<FileRecord, LifecycleError> {
        let record = self.fetch(caller, id).await?;

        self.bounded(self.blobs.delete(&record.blob_key), BlobError::Timeout)
            .await
            .map_err(|e| {
                error!(error = %e, "payload delete failed, record kept");
                LifecycleError::StorageDeleteFailed(e)
            })?;

        let removed = self
            .bounded(self.metadata.delete(id), MetadataError::Timeout)
            .await?;
        self.invalidate(&record.cache_key()).await;

        if !removed {
            // Served from a cache entry that outlived its record.
            warn!("record already gone, stale cache entry dropped");
            return Err(LifecycleError::FileNotFound(*id));
        }

        info!("file deleted");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_expiration_accepts_rfc3339() {
        let parsed = parse_expiration("2030-01-02T03:04:05Z").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2030-01-02T03:04:05+00:00");

        let offset = parse_expiration("2030-01-02T05:04:05+02:00").unwrap();
        assert_eq!(offset, parsed);
    }

    #[test]
    fn parse_expiration_rejects_garbage() {
        let err = parse_expiration("next tuesday").unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::InvalidExpiration { ref value, .. } if value == "next tuesday"
        ));
        assert!(parse_expiration("2030-01-02").is_err(), "date without time");
    }

    #[test]
    fn parse_expiration_truncates_to_micros() {
        let parsed = parse_expiration("2030-01-02T03:04:05.123456789Z").unwrap();
        assert_eq!(parsed.timestamp_subsec_nanos(), 123_456_000);
    }

    #[test]
    fn upload_request_builder() {
        let owner = OwnerId::from(uuid::Uuid::new_v4());
        let req = UploadRequest::new(owner, "a.txt", "text/plain", &b"hi"[..])
            .public(true)
            .expires_at("2030-01-01T00:00:00Z");
        assert!(req.is_public);
        assert_eq!(req.payload.len(), 2);
        assert_eq!(req.expires_at.as_deref(), Some("2030-01-01T00:00:00Z"));
    }
}
