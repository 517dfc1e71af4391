use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{error, info, warn};

use crate::lifecycle::FileLifecycle;

/// Configuration for the [`ExpirySweeper`].
#[derive(Debug, Clone)]
pub struct ExpirySweeperConfig {
    /// Time between sweeps.
    pub interval: Duration,
    /// Sweep immediately on start instead of waiting one interval.
    pub run_on_start: bool,
}

impl Default for ExpirySweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(24 * 60 * 60),
            run_on_start: false,
        }
    }
}

/// Periodic driver for [`FileLifecycle::sweep_expired`].
///
/// Runs until a shutdown signal arrives or the shutdown sender is dropped.
/// A failed sweep is logged and the loop keeps going.
pub struct ExpirySweeper {
    lifecycle: Arc<FileLifecycle>,
    config: ExpirySweeperConfig,
    shutdown_rx: mpsc::Receiver<()>,
}

impl ExpirySweeper {
    /// Run the sweeper until shutdown is signaled.
    pub async fn run(&mut self) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            run_on_start = self.config.run_on_start,
            "expiry sweeper starting"
        );

        let first = if self.config.run_on_start {
            Instant::now()
        } else {
            Instant::now() + self.config.interval
        };
        let mut ticker = interval_at(first, self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown_rx.recv() => {
                    info!("expiry sweeper received shutdown signal");
                    break;
                }
                _ = ticker.tick() => self.sweep_once().await,
            }
        }

        info!("expiry sweeper stopped");
    }

    async fn sweep_once(&self) {
        match self.lifecycle.sweep_expired().await {
            Ok(report) if report.is_clean() => {
                info!(
                    deleted = report.deleted,
                    orphans_reclaimed = report.orphans_reclaimed,
                    "scheduled sweep completed"
                );
            }
            Ok(report) => {
                warn!(
                    deleted = report.deleted,
                    orphans_reclaimed = report.orphans_reclaimed,
                    errors = report.errors.len(),
                    "scheduled sweep completed with errors"
                );
            }
            Err(e) => error!(error = %e, "scheduled sweep failed"),
        }
    }
}

/// Builder for an [`ExpirySweeper`].
#[derive(Default)]
pub struct ExpirySweeperBuilder {
    config: ExpirySweeperConfig,
    lifecycle: Option<Arc<FileLifecycle>>,
}

impl ExpirySweeperBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn config(mut self, config: ExpirySweeperConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn lifecycle(mut self, lifecycle: Arc<FileLifecycle>) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    /// Build the sweeper.
    ///
    /// Returns the sweeper and a shutdown sender.
    pub fn build(self) -> Result<(ExpirySweeper, mpsc::Sender<()>), &'static str> {
        let lifecycle = self.lifecycle.ok_or("lifecycle is required")?;
        if self.config.interval.is_zero() {
            return Err("sweep interval must be non-zero");
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let sweeper = ExpirySweeper {
            lifecycle,
            config: self.config,
            shutdown_rx,
        };
        Ok((sweeper, shutdown_tx))
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use chrono::{TimeDelta, Utc};
    use depot_blob_memory::MemoryObjectStore;
    use depot_cache_memory::MemoryCache;
    use depot_core::{FileRecord, OwnerId};
    use depot_metadata::MetadataStore;
    use depot_metadata_memory::MemoryMetadataStore;
    use uuid::Uuid;

    use super::*;
    use crate::config::LifecycleConfig;
    use crate::lifecycle::UploadRequest;

    struct Fixture {
        lifecycle: Arc<FileLifecycle>,
        metadata: Arc<MemoryMetadataStore>,
        blobs: Arc<MemoryObjectStore>,
    }

    fn fixture() -> Fixture {
        let blobs = Arc::new(MemoryObjectStore::new());
        let metadata = Arc::new(MemoryMetadataStore::new());
        let lifecycle = Arc::new(FileLifecycle::new(
            blobs.clone(),
            metadata.clone(),
            Arc::new(MemoryCache::new()),
            LifecycleConfig::default(),
        ));
        Fixture {
            lifecycle,
            metadata,
            blobs,
        }
    }

    async fn upload_expired(lifecycle: &FileLifecycle) -> FileRecord {
        let past = (Utc::now() - TimeDelta::hours(1)).to_rfc3339();
        lifecycle
            .upload(
                UploadRequest::new(
                    OwnerId::from(Uuid::new_v4()),
                    "old.txt",
                    "text/plain",
                    Bytes::from_static(b"stale"),
                )
                .expires_at(past),
            )
            .await
            .unwrap()
    }

    #[test]
    fn default_config() {
        let cfg = ExpirySweeperConfig::default();
        assert_eq!(cfg.interval, Duration::from_secs(86_400));
        assert!(!cfg.run_on_start);
    }

    #[test]
    fn builder_requires_lifecycle() {
        let result = ExpirySweeperBuilder::new().build();
        assert!(matches!(result, Err("lifecycle is required")));
    }

    #[test]
    fn builder_rejects_zero_interval() {
        let result = ExpirySweeperBuilder::new()
            .lifecycle(fixture().lifecycle)
            .config(ExpirySweeperConfig {
                interval: Duration::ZERO,
                run_on_start: false,
            })
            .build();
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn run_on_start_sweeps_immediately() {
        let fx = fixture();
        let record = upload_expired(&fx.lifecycle).await;

        let (mut sweeper, shutdown_tx) = ExpirySweeperBuilder::new()
            .lifecycle(fx.lifecycle.clone())
            .config(ExpirySweeperConfig {
                interval: Duration::from_secs(3600),
                run_on_start: true,
            })
            .build()
            .unwrap();
        let handle = tokio::spawn(async move { sweeper.run().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(fx.metadata.find_by_id(&record.id).await.unwrap().is_none());
        assert!(!fx.blobs.contains(&record.blob_key));

        shutdown_tx.send(()).await.unwrap();
        let result = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert!(result.is_ok(), "sweeper should stop within timeout");
    }

    #[tokio::test(start_paused = true)]
    async fn waits_one_interval_before_first_sweep() {
        let fx = fixture();
        let record = upload_expired(&fx.lifecycle).await;

        let (mut sweeper, shutdown_tx) = ExpirySweeperBuilder::new()
            .lifecycle(fx.lifecycle.clone())
            .config(ExpirySweeperConfig {
                interval: Duration::from_secs(3600),
                run_on_start: false,
            })
            .build()
            .unwrap();
        let handle = tokio::spawn(async move { sweeper.run().await });

        tokio::time::sleep(Duration::from_secs(3599)).await;
        assert!(fx.metadata.find_by_id(&record.id).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(fx.metadata.find_by_id(&record.id).await.unwrap().is_none());

        shutdown_tx.send(()).await.unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn stops_when_sender_dropped() {
        let (mut sweeper, shutdown_tx) = ExpirySweeperBuilder::new()
            .lifecycle(fixture().lifecycle)
            .build()
            .unwrap();
        let handle = tokio::spawn(async move { sweeper.run().await });
        drop(shutdown_tx);
        let result = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert!(result.is_ok(), "sweeper should stop once the sender is gone");
    }
}
