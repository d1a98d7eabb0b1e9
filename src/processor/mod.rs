//! Batch processor
//!
//! Drives pending records one at a time through the per-record pipeline
//! (directory, metadata, transfer) and decides after each one whether the
//! batch goes on. Exactly one record is worked on at any moment.
//!
//! ## Outcomes
//!
//! | Per-record result            | Record state | Directory | Batch     |
//! |------------------------------|--------------|-----------|-----------|
//! | metadata ok and transfer ok  | `Completed`  | kept      | continues |
//! | cancelled on every attempt   | `Failed`     | removed   | continues |
//! | resource exhausted           | `Pending`    | removed   | run fails |
//! | anything else                | `Pending`    | removed   | stops     |

use crate::artifacts::ArtifactLayout;
use crate::collaborators::MetadataExtractor;
use crate::downloader::Downloader;
use crate::error::Result;
use crate::store::RecordStore;
use crate::types::{BatchEnd, BatchSummary, Event, Record, RecordId, RecordOutcome, RecordState};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

mod record;

/// Capacity of the event channel
const EVENT_CAPACITY: usize = 256;

/// Sequential driver of the record lifecycle
pub struct BatchProcessor {
    store: Arc<RecordStore>,
    layout: ArtifactLayout,
    extractor: Arc<dyn MetadataExtractor>,
    downloader: Downloader,
    event_tx: broadcast::Sender<Event>,
}

impl BatchProcessor {
    /// Create a processor over `store`
    pub fn new(
        store: Arc<RecordStore>,
        layout: ArtifactLayout,
        extractor: Arc<dyn MetadataExtractor>,
        downloader: Downloader,
    ) -> Self {
        let (event_tx, _rx) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            layout,
            extractor,
            downloader,
            event_tx,
        }
    }

    /// Subscribe to processing events
    ///
    /// Events sent while nobody is subscribed are dropped.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// The store this processor works on
    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    /// The artifact layout in use
    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    pub(crate) fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Process pending records until none is left or one stops the batch
    ///
    /// Records left `InProgress` by a crashed run are put back to `Pending`
    /// first. When `preferred` is given, the first iteration works on that
    /// record if it exists and is `Pending`; otherwise the run ends without
    /// touching anything else. Later iterations take the first pending
    /// record in insertion order.
    ///
    /// A panicking collaborator unwinds through here and leaves its record
    /// `InProgress`; the next run puts it back to `Pending`.
    ///
    /// # Errors
    ///
    /// Only resource exhaustion is returned as an error. The record being
    /// processed is reverted to `Pending` and its directory removed before
    /// the error is returned.
    pub async fn run(&self, preferred: Option<RecordId>) -> Result<BatchSummary> {
        match self.store.reset_interrupted().await {
            Ok(0) => {}
            Ok(count) => info!(count, "recovered records interrupted by a previous run"),
            Err(e) => warn!(error = %e, "failed to persist recovered records, continuing"),
        }

        let mut preferred = preferred;
        let mut processed = 0;
        let mut completed = 0;
        let mut skipped = 0;
        let mut aborted = 0;

        let end = loop {
            let record = match self.select_next(preferred.take()).await {
                Ok(Some(record)) => record,
                Ok(None) => break BatchEnd::Exhausted,
                Err(end) => break end,
            };

            processed += 1;
            let outcome = match self.process_record(&record).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(
                        record_id = record.id.0,
                        error = %e,
                        code = e.error_code(),
                        "resources exhausted, stopping batch"
                    );
                    self.revert(&record, &e.to_string()).await;
                    return Err(e);
                }
            };

            match outcome {
                RecordOutcome::Completed => {
                    completed += 1;
                    continue;
                }
                RecordOutcome::Skipped => skipped += 1,
                RecordOutcome::Aborted => aborted += 1,
            }

            // Decide on what the store holds now, not on the local copy
            let current = self.store.get_by_id(record.id).await.map(|r| r.state);
            if current != Some(RecordState::Failed) {
                warn!(
                    record_id = record.id.0,
                    state = ?current,
                    "record did not complete, stopping batch"
                );
                break BatchEnd::Aborted { id: record.id };
            }
        };

        let summary = BatchSummary {
            processed,
            completed,
            skipped,
            aborted,
            remaining_pending: self.store.count_by_state(RecordState::Pending).await,
            end,
        };
        info!(
            processed,
            completed,
            skipped,
            aborted,
            remaining_pending = summary.remaining_pending,
            end = ?summary.end,
            "batch finished"
        );
        self.emit(Event::BatchFinished { summary });
        Ok(summary)
    }

    /// Pick the record for the next iteration
    ///
    /// `Ok(None)` means nothing is pending. `Err` carries the end reason when
    /// a preferred record cannot be used.
    async fn select_next(
        &self,
        preferred: Option<RecordId>,
    ) -> std::result::Result<Option<Record>, BatchEnd> {
        let Some(id) = preferred else {
            return Ok(self.store.first_pending().await);
        };

        match self.store.get_by_id(id).await {
            Some(record) if record.is_pending() => Ok(Some(record)),
            Some(record) => {
                warn!(record_id = id.0, state = %record.state, "preferred record is not pending");
                Err(BatchEnd::PreferredUnavailable { id })
            }
            None => {
                warn!(record_id = id.0, "preferred record does not exist");
                Err(BatchEnd::PreferredUnavailable { id })
            }
        }
    }
}
