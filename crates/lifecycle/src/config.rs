use std::time::Duration;

/// Tuning for [`FileLifecycle`](crate::FileLifecycle).
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Time-to-live for cached records.
    pub cache_ttl: Duration,

    /// Deadline applied to every individual store call.
    pub store_timeout: Duration,

    /// Base URL for public links. Public records get `<base>/<file-id>`.
    pub public_base_url: Option<String>,

    /// Minimum age of an unreferenced blob before the sweep reclaims it.
    pub orphan_grace: Duration,

    /// Whether the sweep also reclaims blobs with no matching record.
    pub reconcile_orphans: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(300),
            store_timeout: Duration::from_secs(30),
            public_base_url: None,
            orphan_grace: Duration::from_secs(3600),
            reconcile_orphans: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let cfg = LifecycleConfig::default();
        assert_eq!(cfg.cache_ttl, Duration::from_secs(300));
        assert_eq!(cfg.store_timeout, Duration::from_secs(30));
        assert!(cfg.public_base_url.is_none());
        assert_eq!(cfg.orphan_grace, Duration::from_secs(3600));
        assert!(cfg.reconcile_orphans);
    }
}
