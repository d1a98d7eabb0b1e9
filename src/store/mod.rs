//! Record store for project-harvest
//!
//! A durable, keyed collection of [`Record`]s kept in a single JSON file.
//! The in-memory collection is the source of truth while the process runs;
//! the file is rewritten wholesale on every persist.
//!
//! ## Submodules
//!
//! Methods on [`RecordStore`] are organized by concern:
//! - [`load`]: reading, legacy-format handling, id backfill
//! - [`records`]: upserts, queries and state transitions
//! - [`persist`]: atomic file writes

use crate::types::{Record, RecordId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

mod load;
mod persist;
mod records;

/// How the persisted file looked when the store was opened
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadStatus {
    /// File parsed; `backfilled` legacy entries received an id
    Loaded {
        /// Number of records read
        records: usize,
        /// Number of records that were assigned an id on load
        backfilled: usize,
    },
    /// No file yet (first run)
    Missing,
    /// The file could not be read; started empty
    Unreadable(String),
    /// The file was not a UTF-8 JSON array of records, or its id-less
    /// records could not be given ids; started empty
    Malformed(String),
}

/// In-memory collection plus its key index
#[derive(Debug, Default)]
struct StoreState {
    records: Vec<Record>,
    /// key -> position in `records`
    index: HashMap<String, usize>,
}

impl StoreState {
    fn from_records(records: Vec<Record>) -> Self {
        let mut index = HashMap::with_capacity(records.len());
        for (pos, record) in records.iter().enumerate() {
            if record.key.is_empty() {
                continue;
            }
            if index.contains_key(&record.key) {
                tracing::warn!(
                    record_id = record.id.0,
                    key = %record.key,
                    "duplicate key in store file, keeping first occurrence indexed"
                );
                continue;
            }
            index.insert(record.key.clone(), pos);
        }
        Self { records, index }
    }

    fn max_id(&self) -> RecordId {
        self.records
            .iter()
            .map(|r| r.id)
            .max()
            .unwrap_or(RecordId(0))
    }

    fn position_of(&self, id: RecordId) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }
}

/// Durable keyed collection of job records
///
/// Shared as `Arc<RecordStore>`; every method takes `&self`.
#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    state: Mutex<StoreState>,
    load_status: LoadStatus,
}

impl RecordStore {
    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// What was found on disk when the store was opened
    pub fn load_status(&self) -> &LoadStatus {
        &self.load_status
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
