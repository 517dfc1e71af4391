use thiserror::Error;

/// Errors that can occur during object store operations.
#[derive(Debug, Error)]
pub enum BlobError {
    /// The requested blob was not found.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// The backend could not be reached.
    #[error("blob store connection error: {0}")]
    Connection(String),

    /// A storage backend error occurred.
    #[error("blob storage error: {0}")]
    Storage(String),

    /// The operation did not complete within its deadline.
    #[error("blob operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}
