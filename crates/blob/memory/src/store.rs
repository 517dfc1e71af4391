use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use depot_blob::{BlobError, BlobListing, ObjectStore};
use depot_core::BlobKey;

#[derive(Debug, Clone)]
struct Entry {
    data: Bytes,
    content_type: String,
    last_modified: DateTime<Utc>,
}

/// In-memory [`ObjectStore`] backed by a [`DashMap`].
///
/// Intended for tests and single-process deployments; contents are lost on
/// restart.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    data: DashMap<String, Entry>,
}

impl MemoryObjectStore {
    /// Create a new, empty in-memory object store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if a blob is stored under `key`.
    pub fn contains(&self, key: &BlobKey) -> bool {
        self.data.contains_key(key.as_str())
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Content type recorded for a blob, if present.
    pub fn content_type(&self, key: &BlobKey) -> Option<String> {
        self.data.get(key.as_str()).map(|e| e.content_type.clone())
    }

    /// Store a blob with an explicit modification time.
    ///
    /// Lets tests age blobs past a reconciliation grace period.
    pub fn insert_with_timestamp(&self, key: &BlobKey, data: Bytes, last_modified: DateTime<Utc>) {
        self.data.insert(
            key.as_str().to_owned(),
            Entry {
                data,
                content_type: "application/octet-stream".to_owned(),
                last_modified,
            },
        );
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &BlobKey, data: Bytes, content_type: &str) -> Result<(), BlobError> {
        self.data.insert(
            key.as_str().to_owned(),
            Entry {
                data,
                content_type: content_type.to_owned(),
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &BlobKey) -> Result<Bytes, BlobError> {
        self.data
            .get(key.as_str())
            .map(|e| e.data.clone())
            .ok_or_else(|| BlobError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &BlobKey) -> Result<bool, BlobError> {
        Ok(self.data.remove(key.as_str()).is_some())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<BlobListing>, BlobError> {
        let listed = self
            .data
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| BlobListing {
                key: BlobKey::new(e.key().clone()),
                size_bytes: e.data.len() as u64,
                last_modified: e.last_modified,
            })
            .collect();
        Ok(listed)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use depot_blob::testing::run_object_store_conformance_tests;
    use depot_core::FileId;

    use super::*;

    #[tokio::test]
    async fn conformance() {
        let store = MemoryObjectStore::new();
        run_object_store_conformance_tests(&store)
            .await
            .expect("conformance tests should pass");
    }

    #[tokio::test]
    async fn put_records_content_type() {
        let store = MemoryObjectStore::new();
        let key = BlobKey::for_file(&FileId::generate());
        store
            .put(&key, Bytes::from_static(b"%PDF"), "application/pdf")
            .await
            .unwrap();
        assert_eq!(store.content_type(&key).as_deref(), Some("application/pdf"));
        assert!(store.contains(&key));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn list_reports_explicit_timestamp() {
        let store = MemoryObjectStore::new();
        let key = BlobKey::for_file(&FileId::generate());
        let old = Utc::now() - Duration::days(2);
        store.insert_with_timestamp(&key, Bytes::from_static(b"x"), old);

        let listed = store.list(BlobKey::PREFIX).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].last_modified, old);
    }
}
