//! One record, end to end.

use super::BatchProcessor;
use crate::artifacts::ArtifactLayout;
use crate::error::{Error, Result, StoreError, TransferError};
use crate::types::{Event, Record, RecordOutcome, RecordState};
use std::path::Path;
use tracing::{debug, error, info, warn};

/// How far an attempt got when nothing went wrong outright
enum Attempt {
    /// Metadata captured and artifacts transferred
    Captured,
    /// The attempt ran through but did not capture everything
    Incomplete(&'static str),
}

impl BatchProcessor {
    /// Take one record through the pipeline
    ///
    /// A record that is not `Pending` in the store is left alone and reported
    /// as `Aborted`. Otherwise it is marked `InProgress`, its directory is
    /// prepared, metadata is captured, the metadata file is written and the
    /// artifacts are transferred. The
    /// record ends `Completed` (directory kept), `Failed` after a transfer
    /// was cancelled on every attempt (directory removed), or back at
    /// `Pending` on any other problem (directory removed).
    ///
    /// # Errors
    ///
    /// Returns an error only when resources are exhausted. In that case the
    /// record is left as it is; [`run`](Self::run) reverts it.
    pub async fn process_record(&self, record: &Record) -> Result<RecordOutcome> {
        let id = record.id;

        match self.store.get_by_id(id).await {
            None => {
                warn!(record_id = id.0, "record disappeared before processing");
                return Ok(RecordOutcome::Aborted);
            }
            Some(current) if !current.is_pending() => {
                warn!(record_id = id.0, state = %current.state, "record is no longer pending");
                return Ok(RecordOutcome::Aborted);
            }
            Some(_) => {}
        }

        match self.store.set_state(id, RecordState::InProgress).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(record_id = id.0, "record disappeared before processing");
                return Ok(RecordOutcome::Aborted);
            }
            Err(Error::Store(StoreError::InvalidTransition { from, .. })) => {
                warn!(record_id = id.0, state = %from, "record is no longer pending");
                return Ok(RecordOutcome::Aborted);
            }
            Err(e) => {
                error!(record_id = id.0, error = %e, "failed to mark record in progress");
                self.revert(record, &e.to_string()).await;
                return Ok(RecordOutcome::Aborted);
            }
        }

        info!(record_id = id.0, name = %record.name, "processing record");
        self.emit(Event::RecordStarted {
            id,
            name: record.name.clone(),
        });

        let dir = self.layout.dir_for(record);
        match self.attempt(record, &dir).await {
            Ok(Attempt::Captured) => {
                self.complete(record, &dir).await;
                Ok(RecordOutcome::Completed)
            }
            Ok(Attempt::Incomplete(reason)) => {
                warn!(record_id = id.0, reason, "record incomplete");
                self.revert(record, reason).await;
                Ok(RecordOutcome::Aborted)
            }
            Err(Error::Transfer(TransferError::Cancelled(msg))) => {
                self.fail(record, &dir, &msg).await;
                Ok(RecordOutcome::Skipped)
            }
            Err(e) if e.is_resource_exhausted() => Err(e),
            Err(e) => {
                error!(record_id = id.0, error = %e, code = e.error_code(), "record processing failed");
                self.revert(record, &e.to_string()).await;
                Ok(RecordOutcome::Aborted)
            }
        }
    }

    async fn attempt(&self, record: &Record, dir: &Path) -> Result<Attempt> {
        self.layout.prepare(record).await?;

        let metadata = self.extractor.extract(record).await?;
        let metadata_ok = metadata.is_ok();
        if !metadata_ok {
            // Not fatal: the transfer is still attempted
            warn!(
                record_id = record.id.0,
                extractor = self.extractor.name(),
                "metadata has no project name"
            );
        }
        self.layout.write_metadata(record, &metadata, dir).await?;

        let transferred = self.downloader.download(record, dir).await?;

        Ok(match (metadata_ok, transferred) {
            (true, true) => Attempt::Captured,
            (false, true) => Attempt::Incomplete("metadata incomplete"),
            (_, false) => Attempt::Incomplete("transfer failed"),
        })
    }

    async fn complete(&self, record: &Record, dir: &Path) {
        if let Err(e) = self.store.set_state(record.id, RecordState::Completed).await {
            error!(record_id = record.id.0, error = %e, "failed to persist completed state");
        }
        if !ArtifactLayout::is_populated(dir).await {
            warn!(record_id = record.id.0, ?dir, "record completed with an empty directory");
        }

        info!(record_id = record.id.0, ?dir, "record completed");
        self.emit(Event::RecordCompleted {
            id: record.id,
            path: dir.to_path_buf(),
        });
    }

    async fn fail(&self, record: &Record, dir: &Path, reason: &str) {
        warn!(record_id = record.id.0, error = %reason, "transfer cancelled on every attempt, parking record");

        if let Err(e) = self.store.set_state(record.id, RecordState::Failed).await {
            error!(record_id = record.id.0, error = %e, "failed to persist failed state");
        }
        self.layout.cleanup(record.id, dir).await;

        self.emit(Event::RecordFailed {
            id: record.id,
            error: reason.to_string(),
        });
    }

    /// Put a record back to `Pending` and remove its directory
    pub(super) async fn revert(&self, record: &Record, reason: &str) {
        match self.store.set_state(record.id, RecordState::Pending).await {
            Ok(_) => debug!(record_id = record.id.0, "record reverted to pending"),
            Err(e) => error!(record_id = record.id.0, error = %e, "failed to revert record to pending"),
        }
        self.layout
            .cleanup(record.id, &self.layout.dir_for(record))
            .await;

        self.emit(Event::RecordReverted {
            id: record.id,
            reason: reason.to_string(),
        });
    }
}
