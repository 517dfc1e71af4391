use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::FileId;

/// Key under which a file's payload is stored in the object store.
///
/// Derived from the file identity as `files/<id>`. The key is internal and
/// must never be handed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobKey(String);

impl BlobKey {
    /// Prefix shared by every file blob.
    pub const PREFIX: &'static str = "files/";

    /// Derive the blob key for a file.
    #[must_use]
    pub fn for_file(id: &FileId) -> Self {
        Self(format!("{}{id}", Self::PREFIX))
    }

    /// Wrap a raw key as returned by a backend listing.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Recover the file identity this key was derived from.
    pub fn file_id(&self) -> Result<FileId, CoreError> {
        self.0
            .strip_prefix(Self::PREFIX)
            .and_then(|rest| rest.parse().ok())
            .ok_or_else(|| CoreError::UnmappedBlobKey(self.0.clone()))
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cache key for a file record: `file:<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub const PREFIX: &'static str = "file:";

    #[must_use]
    pub fn for_file(id: &FileId) -> Self {
        Self(format!("{}{id}", Self::PREFIX))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_key_roundtrips_to_file_id() {
        let id = FileId::generate();
        let key = BlobKey::for_file(&id);
        assert_eq!(key.as_str(), format!("files/{id}"));
        assert_eq!(key.file_id().unwrap(), id);
    }

    #[test]
    fn foreign_blob_key_is_unmapped() {
        assert!(BlobKey::new("thumbnails/abc").file_id().is_err());
        assert!(BlobKey::new("files/not-a-uuid").file_id().is_err());
    }

    #[test]
    fn cache_key_format() {
        let id: FileId = "550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
        assert_eq!(
            CacheKey::for_file(&id).as_str(),
            "file:550e8400-e29b-41d4-a716-446655440000"
        );
    }
}
