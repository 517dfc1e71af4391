use async_trait::async_trait;
use chrono::{DateTime, Utc};

use depot_core::{FileId, FileRecord, OwnerId, SearchFilter};

use crate::error::MetadataError;

/// Durable store of [`FileRecord`]s.
///
/// Implementations must be `Send + Sync` and provide per-record atomicity;
/// concurrent `update` calls on one record resolve last-writer-wins.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert a new record. Fails with [`MetadataError::Conflict`] if the id exists.
    async fn create(&self, record: &FileRecord) -> Result<(), MetadataError>;

    /// Load a record by id. Returns `None` if absent.
    async fn find_by_id(&self, id: &FileId) -> Result<Option<FileRecord>, MetadataError>;

    /// All records owned by `owner`, in creation order.
    async fn find_by_owner(&self, owner: &OwnerId) -> Result<Vec<FileRecord>, MetadataError>;

    /// Records owned by `owner` matching every populated field of `filter`,
    /// in creation order.
    async fn find_filtered(
        &self,
        owner: &OwnerId,
        filter: &SearchFilter,
    ) -> Result<Vec<FileRecord>, MetadataError>;

    /// Every record whose `expires_at` is at or before `now`.
    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<FileRecord>, MetadataError>;

    /// Replace an existing record. Fails with [`MetadataError::NotFound`] if absent.
    async fn update(&self, record: &FileRecord) -> Result<(), MetadataError>;

    /// Delete a record. Returns `true` if it existed.
    async fn delete(&self, id: &FileId) -> Result<bool, MetadataError>;
}
