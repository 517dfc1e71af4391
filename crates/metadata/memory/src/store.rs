use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use depot_core::{FileId, FileRecord, OwnerId, SearchFilter};
use depot_metadata::{MetadataError, MetadataStore};

/// In-memory [`MetadataStore`] backed by a [`DashMap`].
///
/// Query results are ordered by `created_at`, then by id.
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    records: DashMap<FileId, FileRecord>,
}

impl MemoryMetadataStore {
    /// Create a new, empty in-memory metadata store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn collect_sorted(&self, mut keep: impl FnMut(&FileRecord) -> bool) -> Vec<FileRecord> {
        let mut found: Vec<FileRecord> = self
            .records
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        found
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn create(&self, record: &FileRecord) -> Result<(), MetadataError> {
        match self.records.entry(record.id) {
            Entry::Occupied(_) => Err(MetadataError::Conflict(record.id)),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn find_by_id(&self, id: &FileId) -> Result<Option<FileRecord>, MetadataError> {
        Ok(self.records.get(id).map(|r| r.value().clone()))
    }

    async fn find_by_owner(&self, owner: &OwnerId) -> Result<Vec<FileRecord>, MetadataError> {
        Ok(self.collect_sorted(|r| r.is_owned_by(owner)))
    }

    async fn find_filtered(
        &self,
        owner: &OwnerId,
        filter: &SearchFilter,
    ) -> Result<Vec<FileRecord>, MetadataError> {
        Ok(self.collect_sorted(|r| r.is_owned_by(owner) && filter.matches(r)))
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<FileRecord>, MetadataError> {
        Ok(self.collect_sorted(|r| r.is_expired_at(now)))
    }

    async fn update(&self, record: &FileRecord) -> Result<(), MetadataError> {
        match self.records.get_mut(&record.id) {
            Some(mut existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(MetadataError::NotFound(record.id)),
        }
    }

    async fn delete(&self, id: &FileId) -> Result<bool, MetadataError> {
        Ok(self.records.remove(id).is_some())
    }
}
