use async_trait::async_trait;
use bytes::Bytes;

use depot_core::BlobKey;

use crate::error::BlobError;
use crate::types::BlobListing;

/// Object store holding raw file payloads by opaque key.
///
/// Implementations must be safe for concurrent access. Per-key atomicity is
/// assumed: a `put` is either fully visible or not at all.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` under `key`, overwriting any previous blob.
    async fn put(&self, key: &BlobKey, data: Bytes, content_type: &str) -> Result<(), BlobError>;

    /// Fetch a blob. Returns [`BlobError::NotFound`] if absent.
    async fn get(&self, key: &BlobKey) -> Result<Bytes, BlobError>;

    /// Delete a blob. Returns `true` if the blob existed.
    ///
    /// Deleting an absent key is not an error.
    async fn delete(&self, key: &BlobKey) -> Result<bool, BlobError>;

    /// List every blob whose key starts with `prefix`.
    ///
    /// Used for orphan reconciliation; may be expensive on large buckets.
    async fn list(&self, prefix: &str) -> Result<Vec<BlobListing>, BlobError>;
}
