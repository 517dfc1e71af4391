mod backends;
mod lifecycle;
mod server;
mod telemetry;


pub use backends::*;
pub use lifecycle::*;
pub use server::*;
pub use telemetry::*;

use serde::Deserialize;

/// Top-level configuration for the depot server, loaded from a TOML file.
///
/// Every section is optional; an empty file yields an all-in-memory setup.
#[derive(Debug, Default, Deserialize)]
pub struct DepotConfig {
    /// Process-level settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Object store backend for file payloads.
    #[serde(default)]
    pub blob: BlobConfig,
    /// Metadata store backend for file records.
    #[serde(default)]
    pub metadata: MetadataConfig,
    /// Record cache backend.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Orchestrator tuning.
    #[serde(default)]
    pub lifecycle: LifecycleSection,
    /// Periodic expiry sweep.
    #[serde(default)]
    pub sweeper: SweeperSection,
    /// OpenTelemetry distributed tracing configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}
