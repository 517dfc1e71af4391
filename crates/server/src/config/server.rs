use serde::Deserialize;

/// Process-level configuration.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Graceful shutdown timeout in seconds.
    ///
    /// Upper bound on how long shutdown waits for an in-progress sweep.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_seconds: default_shutdown_timeout(),
        }
    }
}

fn default_shutdown_timeout() -> u64 {
    30
}
