use thiserror::Error;

use depot_core::FileId;

/// Errors from metadata store operations.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("file record not found: {0}")]
    NotFound(FileId),

    #[error("file record already exists: {0}")]
    Conflict(FileId),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}
