use thiserror::Error;

use depot_lifecycle::LifecycleError;

/// Errors that can occur when running the depot server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A configuration error, including backend construction failures.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O error (e.g. reading the config file).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A lifecycle operation failed.
    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),
}
