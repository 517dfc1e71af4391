use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use depot_blob::BlobError;
use depot_cache::CacheError;
use depot_core::{BlobKey, FileId, FileRecord};
use depot_metadata::MetadataError;

use crate::error::LifecycleError;
use crate::lifecycle::FileLifecycle;

/// Step of a sweep that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepStep {
    DeleteBlob,
    DeleteRecord,
    InvalidateCache,
    ListBlobs,
    LookupRecord,
}

/// A non-fatal failure recorded during a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepFailure {
    pub file_id: Option<FileId>,
    pub step: SweepStep,
    pub message: String,
}

/// Outcome of one [`FileLifecycle::sweep_expired`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Expired records removed from the metadata store.
    pub deleted: usize,
    /// Unreferenced blobs removed by reconciliation.
    pub orphans_reclaimed: usize,
    pub errors: Vec<SweepFailure>,
}

impl SweepReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    fn fail(&mut self, file_id: Option<FileId>, step: SweepStep, message: impl ToString) {
        let message = message.to_string();
        warn!(
            file_id = ?file_id,
            step = ?step,
            error = %message,
            "sweep step failed"
        );
        self.errors.push(SweepFailure {
            file_id,
            step,
            message,
        });
    }
}

impl FileLifecycle {
    /// Remove every expired file, then reclaim unreferenced blobs.
    ///
    /// Each step for each record is attempted independently and failures are
    /// collected in the report. Re-running after a partial failure retries
    /// whatever is left: records still present are found again, and blobs whose
    /// record is gone are reclaimed once older than the orphan grace period.
    ///
    /// # Errors
    ///
    /// Only a failure to query expired records is returned as an error.
    #[instrument(skip(self))]
    pub async fn sweep_expired(&self) -> Result<SweepReport, LifecycleError> {
        let now = Utc::now();
        let expired = self
            .bounded(self.metadata.find_expired(now), MetadataError::Timeout)
            .await?;
        debug!(count = expired.len(), "expired records found");

        let mut report = SweepReport::default();
        for record in &expired {
            self.sweep_record(record, &mut report).await;
        }

        if self.config.reconcile_orphans {
            self.reconcile_orphans(now, &mut report).await;
        }

        info!(
            deleted = report.deleted,
            orphans_reclaimed = report.orphans_reclaimed,
            errors = report.errors.len(),
            "sweep finished"
        );
        Ok(report)
    }

    async fn sweep_record(&self, record: &FileRecord, report: &mut SweepReport) {
        let id = Some(record.id);

        if let Err(e) = self
            .bounded(self.blobs.delete(&record.blob_key), BlobError::Timeout)
            .await
        {
            report.fail(id, SweepStep::DeleteBlob, e);
        }

        match self
            .bounded(self.metadata.delete(&record.id), MetadataError::Timeout)
            .await
        {
            Ok(true) => report.deleted += 1,
            Ok(false) => debug!(file_id = %record.id, "record already removed"),
            Err(e) => report.fail(id, SweepStep::DeleteRecord, e),
        }

        // Issued after the record delete so a concurrent fetch cannot refill it.
        let key = record.cache_key();
        if let Err(e) = self
            .bounded(self.cache.delete(&key), CacheError::Timeout)
            .await
        {
            report.fail(id, SweepStep::InvalidateCache, e);
        }
    }

    /// Delete blobs under [`BlobKey::PREFIX`] that are older than the grace
    /// period and have no metadata record.
    async fn reconcile_orphans(&self, now: DateTime<Utc>, report: &mut SweepReport) {
        let listed = match self
            .bounded(self.blobs.list(BlobKey::PREFIX), BlobError::Timeout)
            .await
        {
            Ok(listed) => listed,
            Err(e) => {
                report.fail(None, SweepStep::ListBlobs, e);
                return;
            }
        };

        let grace = TimeDelta::from_std(self.config.orphan_grace).unwrap_or(TimeDelta::MAX);
        let cutoff = now.checked_sub_signed(grace).unwrap_or(DateTime::<Utc>::MIN_UTC);

        for blob in listed.iter().filter(|b| b.last_modified <= cutoff) {
            let Ok(id) = blob.key.file_id() else {
                debug!(key = %blob.key, "skipping blob with unrecognised key");
                continue;
            };

            match self
                .bounded(self.metadata.find_by_id(&id), MetadataError::Timeout)
                .await
            {
                Ok(Some(_)) => continue,
                Ok(None) => {}
                Err(e) => {
                    report.fail(Some(id), SweepStep::LookupRecord, e);
                    continue;
                }
            }

            match self
                .bounded(self.blobs.delete(&blob.key), BlobError::Timeout)
                .await
            {
                Ok(true) => {
                    debug!(file_id = %id, "orphaned blob reclaimed");
                    report.orphans_reclaimed += 1;
                }
                Ok(false) => {}
                Err(e) => report.fail(Some(id), SweepStep::DeleteBlob, e),
            }
        }
    }
}
