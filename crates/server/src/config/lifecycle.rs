use std::time::Duration;

use serde::Deserialize;

use depot_lifecycle::{ExpirySweeperConfig, LifecycleConfig};

use crate::error::ServerError;

/// Orchestrator tuning.
#[derive(Debug, Deserialize)]
pub struct LifecycleSection {
    /// Time-to-live for cached records (seconds).
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
    /// Deadline for each individual store call (seconds).
    #[serde(default = "default_store_timeout")]
    pub store_timeout_seconds: u64,
    /// Base URL for public file links (e.g. `https://files.example.com`).
    pub public_base_url: Option<String>,
    /// Minimum age before an unreferenced blob is reclaimed (seconds).
    #[serde(default = "default_orphan_grace")]
    pub orphan_grace_seconds: u64,
    /// Whether sweeps reclaim blobs that have no metadata record.
    #[serde(default = "default_true")]
    pub reconcile_orphans: bool,
}

impl Default for LifecycleSection {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: default_cache_ttl(),
            store_timeout_seconds: default_store_timeout(),
            public_base_url: None,
            orphan_grace_seconds: default_orphan_grace(),
            reconcile_orphans: true,
        }
    }
}

impl LifecycleSection {
    /// Convert to the orchestrator's config.
    ///
    /// # Errors
    ///
    /// A zero `store_timeout_seconds` is rejected; it would fail every store call.
    pub fn to_lifecycle_config(&self) -> Result<LifecycleConfig, ServerError> {
        if self.store_timeout_seconds == 0 {
            return Err(ServerError::Config(
                "lifecycle.store_timeout_seconds must be non-zero".into(),
            ));
        }
        Ok(LifecycleConfig {
            cache_ttl: Duration::from_secs(self.cache_ttl_seconds),
            store_timeout: Duration::from_secs(self.store_timeout_seconds),
            public_base_url: self.public_base_url.clone(),
            orphan_grace: Duration::from_secs(self.orphan_grace_seconds),
            reconcile_orphans: self.reconcile_orphans,
        })
    }
}

/// Periodic expiry sweep configuration.
#[derive(Debug, Deserialize)]
pub struct SweeperSection {
    /// Whether `run` starts the periodic sweeper.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Time between sweeps (seconds).
    #[serde(default = "default_sweep_interval")]
    pub interval_seconds: u64,
    /// Sweep once immediately at startup.
    #[serde(default)]
    pub run_on_start: bool,
}

impl Default for SweeperSection {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: default_sweep_interval(),
            run_on_start: false,
        }
    }
}

impl SweeperSection {
    pub fn to_sweeper_config(&self) -> ExpirySweeperConfig {
        ExpirySweeperConfig {
            interval: Duration::from_secs(self.interval_seconds),
            run_on_start: self.run_on_start,
        }
    }
}

fn default_cache_ttl() -> u64 {
    300
}

fn default_store_timeout() -> u64 {
    30
}

fn default_orphan_grace() -> u64 {
    3600
}

fn default_sweep_interval() -> u64 {
    86_400
}

fn default_true() -> bool {
    true
}
