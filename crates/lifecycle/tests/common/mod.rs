//! Shared harness for lifecycle tests: in-memory stores wrapped in
//! decorators that inject failures on demand.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use depot_blob::{BlobError, BlobListing, ObjectStore};
use depot_blob_memory::MemoryObjectStore;
use depot_cache::{Cache, CacheError};
use depot_cache_memory::MemoryCache;
use depot_core::{BlobKey, CacheKey, FileId, FileRecord, OwnerId, SearchFilter};
use depot_lifecycle::{FileLifecycle, LifecycleConfig, UploadRequest};
use depot_metadata::{MetadataError, MetadataStore};
use depot_metadata_memory::MemoryMetadataStore;

// -- Object store decorator --

#[derive(Default)]
pub struct FaultyBlobs {
    pub inner: MemoryObjectStore,
    pub fail_puts: AtomicBool,
    pub fail_deletes: AtomicBool,
    pub fail_lists: AtomicBool,
    pub put_delay: Option<Duration>,
    pub deletes: AtomicUsize,
}

impl FaultyBlobs {
    pub fn with_put_delay(delay: Duration) -> Self {
        Self {
            put_delay: Some(delay),
            ..Self::default()
        }
    }
}

#[async_trait]
impl ObjectStore for FaultyBlobs {
    async fn put(&self, key: &BlobKey, data: Bytes, content_type: &str) -> Result<(), BlobError> {
        if let Some(delay) = self.put_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(BlobError::Connection("injected put failure".into()));
        }
        self.inner.put(key, data, content_type).await
    }

    async fn get(&self, key: &BlobKey) -> Result<Bytes, BlobError> {
        self.inner.get(key).await
    }

    async fn delete(&self, key: &BlobKey) -> Result<bool, BlobError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(BlobError::Storage("injected delete failure".into()));
        }
        self.inner.delete(key).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<BlobListing>, BlobError> {
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(BlobError::Connection("injected list failure".into()));
        }
        self.inner.list(prefix).await
    }
}

// -- Metadata store decorator --

#[derive(Default)]
pub struct FaultyMetadata {
    pub inner: MemoryMetadataStore,
    pub fail_next_create: AtomicBool,
    pub fail_deletes: AtomicBool,
    pub fail_find_expired: AtomicBool,
    pub reads: AtomicUsize,
}

#[async_trait]
impl MetadataStore for FaultyMetadata {
    async fn create(&self, record: &FileRecord) -> Result<(), MetadataError> {
        if self.fail_next_create.swap(false, Ordering::SeqCst) {
            return Err(MetadataError::Backend("injected create failure".into()));
        }
        self.inner.create(record).await
    }

    async fn find_by_id(&self, id: &FileId) -> Result<Option<FileRecord>, MetadataError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_id(id).await
    }

    async fn find_by_owner(&self, owner: &OwnerId) -> Result<Vec<FileRecord>, MetadataError> {
        self.inner.find_by_owner(owner).await
    }

    async fn find_filtered(
        &self,
        owner: &OwnerId,
        filter: &SearchFilter,
    ) -> Result<Vec<FileRecord>, MetadataError> {
        self.inner.find_filtered(owner, filter).await
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<FileRecord>, MetadataError> {
        if self.fail_find_expired.load(Ordering::SeqCst) {
            return Err(MetadataError::Connection("injected query failure".into()));
        }
        self.inner.find_expired(now).await
    }

    async fn update(&self, record: &FileRecord) -> Result<(), MetadataError> {
        self.inner.update(record).await
    }

    async fn delete(&self, id: &FileId) -> Result<bool, MetadataError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(MetadataError::Backend("injected delete failure".into()));
        }
        self.inner.delete(id).await
    }
}

// -- Cache decorator --

#[derive(Default)]
pub struct FaultyCache {
    pub inner: MemoryCache,
    pub broken: AtomicBool,
}

impl FaultyCache {
    fn check(&self) -> Result<(), CacheError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(CacheError::Connection("injected cache outage".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Cache for FaultyCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheError> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &CacheKey, value: Bytes, ttl: Duration) -> Result<(), CacheError> {
        self.check()?;
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool, CacheError> {
        self.check()?;
        self.inner.delete(key).await
    }
}

// -- Harness --

pub struct Harness {
    pub lifecycle: FileLifecycle,
    pub blobs: Arc<FaultyBlobs>,
    pub metadata: Arc<FaultyMetadata>,
    pub cache: Arc<FaultyCache>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(FaultyBlobs::default(), LifecycleConfig::default())
    }

    pub fn with_config(config: LifecycleConfig) -> Self {
        Self::with(FaultyBlobs::default(), config)
    }

    pub fn with(blobs: FaultyBlobs, config: LifecycleConfig) -> Self {
        let blobs = Arc::new(blobs);
        let metadata = Arc::new(FaultyMetadata::default());
        let cache = Arc::new(FaultyCache::default());
        let lifecycle = FileLifecycle::new(blobs.clone(), metadata.clone(), cache.clone(), config);
        Self {
            lifecycle,
            blobs,
            metadata,
            cache,
        }
    }

    pub async fn cached(&self, id: &FileId) -> Option<FileRecord> {
        let bytes = self.cache.inner.get(&CacheKey::for_file(id)).await.unwrap()?;
        Some(serde_json::from_slice(&bytes).expect("cache holds a serialized record"))
    }
}

pub fn owner() -> OwnerId {
    OwnerId::from(uuid::Uuid::new_v4())
}

pub fn report_pdf(owner: OwnerId) -> UploadRequest {
    UploadRequest::new(
        owner,
        "report.pdf",
        "application/pdf",
        Bytes::from(vec![7u8; 1024]),
    )
}

pub fn text_file(owner: OwnerId, name: &str) -> UploadRequest {
    UploadRequest::new(owner, name, "text/plain", Bytes::from_static(b"hello"))
}

pub fn rfc3339_from_now(offset: chrono::TimeDelta) -> String {
    (Utc::now() + offset).to_rfc3339()
}
