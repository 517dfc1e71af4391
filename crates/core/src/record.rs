use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::key::{BlobKey, CacheKey};
use crate::types::{FileId, OwnerId};

/// Metadata for one stored file.
///
/// `id` and `owner` never change after creation. Only sharing mutates a
/// record (`is_public`, `public_url`, `expires_at`, `updated_at`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Unique file identity.
    pub id: FileId,
    /// Owner of the file.
    pub owner: OwnerId,
    /// Display name supplied at upload.
    pub name: String,
    /// Size in bytes, computed from the stored payload.
    pub size_bytes: u64,
    /// MIME content type (e.g. `"application/pdf"`).
    pub content_type: String,
    /// Object store key. Internal; use [`FileView`] for anything leaving the process.
    pub blob_key: BlobKey,
    /// Public URL, derived when the file is public and a base URL is configured.
    pub public_url: Option<String>,
    /// Whether the file has been made public.
    pub is_public: bool,
    /// When the file expires. `None` means never.
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileRecord {
    /// Returns `true` if the record's expiration is at or before `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    #[must_use]
    pub fn is_owned_by(&self, owner: &OwnerId) -> bool {
        self.owner == *owner
    }

    #[must_use]
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::for_file(&self.id)
    }

    /// Outward-facing projection of this record.
    #[must_use]
    pub fn view(&self) -> FileView {
        FileView::from(self)
    }
}

/// A [`FileRecord`] without internal storage details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileView {
    pub id: FileId,
    pub owner: OwnerId,
    pub name: String,
    pub size_bytes: u64,
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
    pub is_public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&FileRecord> for FileView {
    fn from(record: &FileRecord) -> Self {
        Self {
            id: record.id,
            owner: record.owner,
            name: record.name.clone(),
            size_bytes: record.size_bytes,
            content_type: record.content_type.clone(),
            public_url: record.public_url.clone(),
            is_public: record.is_public,
            expires_at: record.expires_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use uuid::Uuid;

    use super::*;

    fn sample(expires_at: Option<DateTime<Utc>>) -> FileRecord {
        let id = FileId::generate();
        let now = Utc::now();
        FileRecord {
            id,
            owner: OwnerId::from(Uuid::new_v4()),
            name: "report.pdf".into(),
            size_bytes: 1024,
            content_type: "application/pdf".into(),
            blob_key: BlobKey::for_file(&id),
            public_url: None,
            is_public: false,
            expires_at,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn expiry_is_inclusive_of_now() {
        let now = Utc::now();
        assert!(sample(Some(now)).is_expired_at(now));
        assert!(sample(Some(now - Duration::hours(1))).is_expired_at(now));
        assert!(!sample(Some(now + Duration::hours(1))).is_expired_at(now));
        assert!(!sample(None).is_expired_at(now));
    }

    #[test]
    fn view_hides_blob_key() {
        let record = sample(None);
        let json = serde_json::to_value(record.view()).unwrap();
        assert!(json.get("blob_key").is_none());
        assert_eq!(json["name"], "report.pdf");
        assert!(json.get("expires_at").is_none());
    }

    #[test]
    fn ownership_check() {
        let record = sample(None);
        assert!(record.is_owned_by(&record.owner));
        assert!(!record.is_owned_by(&OwnerId::from(Uuid::new_v4())));
    }
}
