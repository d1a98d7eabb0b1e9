//! Feeding collected records into the store

use crate::collaborators::RecordSource;
use crate::error::Result;
use crate::store::RecordStore;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Totals for one ingest pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    /// Records reported by the source
    pub collected: usize,
    /// Records that were not in the store before
    pub new: usize,
    /// Records in the store afterwards
    pub total: usize,
}

/// Collect from `source` and upsert everything into `store`
///
/// Known keys keep their id and state; only their descriptive fields are
/// refreshed.
pub async fn ingest_from(source: &dyn RecordSource, store: &RecordStore) -> Result<IngestSummary> {
    let incoming = source.collect().await?;
    let new = store.upsert_many(&incoming).await?;

    let summary = IngestSummary {
        collected: incoming.len(),
        new,
        total: store.len().await,
    };
    info!(
        source = source.name(),
        collected = summary.collected,
        new = summary.new,
        total = summary.total,
        "ingest complete"
    );
    Ok(summary)
}
