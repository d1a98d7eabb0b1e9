//! Store loading: first-run handling, legacy formats, id backfill.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::{LoadStatus, RecordStore, StoreState};
use crate::types::{Record, RecordId, RecordState};

/// On-disk shape of a record; older files may lack `id` or use legacy field names
#[derive(Debug, Deserialize)]
struct StoredRecord {
    #[serde(default)]
    id: Option<RecordId>,
    #[serde(default, alias = "url")]
    key: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default, alias = "estado")]
    state: Option<RecordState>,
}

impl RecordStore {
    /// Open the store at `path`
    ///
    /// Never fails: a missing, unreadable or malformed file yields an empty
    /// store and the reason is logged and kept in [`load_status`](Self::load_status).
    /// A malformed file is moved aside before anything overwrites it.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let (records, load_status) = match tokio::fs::read(&path).await {
            Ok(raw) => parse_store_file(&path, &raw).await,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "store file does not exist yet, starting empty");
                (Vec::new(), LoadStatus::Missing)
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to read store file, starting empty");
                (Vec::new(), LoadStatus::Unreadable(e.to_string()))
            }
        };

        let store = Self {
            path,
            state: Mutex::new(StoreState::from_records(records)),
            load_status,
        };

        if let LoadStatus::Loaded { backfilled, .. } = &store.load_status
            && *backfilled > 0
        {
            let state = store.state.lock().await;
            if let Err(e) = store.persist(&state.records).await {
                warn!(error = %e, "failed to persist backfilled ids, will retry on next write");
            }
        }

        store
    }
}

async fn parse_store_file(path: &Path, raw: &[u8]) -> (Vec<Record>, LoadStatus) {
    if raw.trim_ascii().is_empty() {
        warn!(path = %path.display(), "store file is empty, starting empty");
        return (Vec::new(), LoadStatus::Malformed("empty file".to_string()));
    }

    let stored: Vec<StoredRecord> = match serde_json::from_slice(raw) {
        Ok(stored) => stored,
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "store file is not a list of records, starting empty"
            );
            quarantine(path).await;
            return (Vec::new(), LoadStatus::Malformed(e.to_string()));
        }
    };

    let Some((records, backfilled)) = assign_missing_ids(stored) else {
        warn!(
            path = %path.display(),
            "store file leaves no room for missing ids, starting empty"
        );
        quarantine(path).await;
        return (
            Vec::new(),
            LoadStatus::Malformed("no ids left for records without one".to_string()),
        );
    };
    info!(
        path = %path.display(),
        records = records.len(),
        backfilled,
        "store loaded"
    );

    let status = LoadStatus::Loaded {
        records: records.len(),
        backfilled,
    };
    (records, status)
}

/// Give every id-less entry `max + 1`, in file order, leaving existing ids alone
///
/// `None` if the ids run past `i64::MAX`.
fn assign_missing_ids(stored: Vec<StoredRecord>) -> Option<(Vec<Record>, usize)> {
    let mut last_id = stored
        .iter()
        .filter_map(|s| s.id)
        .max()
        .unwrap_or(RecordId(0));
    let mut backfilled = 0;

    let mut records = Vec::with_capacity(stored.len());
    for s in stored {
        let id = match s.id {
            Some(id) => id,
            None => {
                last_id = last_id.next()?;
                backfilled += 1;
                debug!(record_id = last_id.0, "assigned id to legacy record");
                last_id
            }
        };
        records.push(Record {
            id,
            key: s.key.unwrap_or_default().trim().to_string(),
            name: s.name.unwrap_or_default(),
            due_date: s.due_date.unwrap_or_default(),
            state: s.state.unwrap_or_default(),
        });
    }

    Some((records, backfilled))
}

/// Move an unparseable store file aside so the next persist does not destroy it
async fn quarantine(path: &Path) {
    let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S");
    let mut target = path.as_os_str().to_owned();
    target.push(format!(".corrupt-{stamp}"));
    let target = PathBuf::from(target);

    match tokio::fs::rename(path, &target).await {
        Ok(()) => warn!(
            path = %path.display(),
            moved_to = %target.display(),
            "malformed store file moved aside"
        ),
        Err(e) => warn!(
            path = %path.display(),
            error = %e,
            "could not move malformed store file aside"
        ),
    }
}
