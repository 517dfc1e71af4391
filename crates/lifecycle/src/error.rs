use thiserror::Error;

use depot_blob::BlobError;
use depot_core::FileId;
use depot_metadata::MetadataError;

/// Errors surfaced by [`FileLifecycle`](crate::FileLifecycle) operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("failed to write file payload: {0}")]
    StorageWriteFailed(#[source] BlobError),

    #[error("failed to delete file payload: {0}")]
    StorageDeleteFailed(#[source] BlobError),

    #[error("failed to read file payload: {0}")]
    StorageReadFailed(#[source] BlobError),

    #[error("invalid expiration {value:?}: {reason}")]
    InvalidExpiration { value: String, reason: String },

    #[error("file not found: {0}")]
    FileNotFound(FileId),

    #[error("caller does not own file {0}")]
    Unauthorized(FileId),

    #[error("metadata store error: {0}")]
    Metadata(#[from] MetadataError),
}

/// Coarse classification of a [`LifecycleError`] for transport mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    InvalidInput,
    Unavailable,
    Internal,
}

impl LifecycleError {
    /// Classify the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FileNotFound(_) => ErrorKind::NotFound,
            Self::Unauthorized(_) => ErrorKind::Forbidden,
            Self::InvalidExpiration { .. } => ErrorKind::InvalidInput,
            Self::StorageWriteFailed(e)
            | Self::StorageDeleteFailed(e)
            | Self::StorageReadFailed(e) => match e {
                BlobError::Connection(_) | BlobError::Timeout(_) => ErrorKind::Unavailable,
                BlobError::NotFound(_) | BlobError::Storage(_) => ErrorKind::Internal,
            },
            Self::Metadata(e) => match e {
                MetadataError::Connection(_) | MetadataError::Timeout(_) => {
                    ErrorKind::Unavailable
                }
                _ => ErrorKind::Internal,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn not_found_and_unauthorized_are_distinct() {
        let id = FileId::generate();
        assert_eq!(LifecycleError::FileNotFound(id).kind(), ErrorKind::NotFound);
        assert_eq!(LifecycleError::Unauthorized(id).kind(), ErrorKind::Forbidden);
    }

    #[test]
    fn timeouts_are_unavailable() {
        let blob = LifecycleError::StorageWriteFailed(BlobError::Timeout(Duration::from_secs(1)));
        let meta = LifecycleError::Metadata(MetadataError::Timeout(Duration::from_secs(1)));
        assert_eq!(blob.kind(), ErrorKind::Unavailable);
        assert_eq!(meta.kind(), ErrorKind::Unavailable);
    }

    #[test]
    fn invalid_expiration_message() {
        let err = LifecycleError::InvalidExpiration {
            value: "tomorrow".into(),
            reason: "input contains invalid characters".into(),
        };
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().contains("\"tomorrow\""));
    }
}
