use thiserror::Error;

/// Errors raised while parsing or validating core types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid identifier '{value}': {reason}")]
    InvalidId { value: String, reason: String },

    #[error("blob key '{0}' does not map to a file")]
    UnmappedBlobKey(String),
}
