//! Custom test assertions

use project_harvest::{RecordState, RecordStore};
use std::path::Path;
use walkdir::WalkDir;

/// Number of regular files below `dir`
pub fn count_files(dir: &Path) -> usize {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .count()
}

/// Assert `dir` exists and holds at least one file
pub fn assert_populated(dir: &Path) {
    assert!(dir.is_dir(), "expected directory {}", dir.display());
    assert!(
        count_files(dir) > 0,
        "expected files in {}",
        dir.display()
    );
}

/// Assert `dir` does not exist
pub fn assert_removed(dir: &Path) {
    assert!(!dir.exists(), "expected {} to be removed", dir.display());
}

/// Assert no record is left `InProgress`
pub async fn assert_nothing_in_progress(store: &RecordStore) {
    let stuck: Vec<_> = store
        .snapshot()
        .await
        .into_iter()
        .filter(|r| r.state == RecordState::InProgress)
        .map(|r| r.id)
        .collect();
    assert!(stuck.is_empty(), "records left in progress: {stuck:?}");
}

/// States of every record, in insertion order
pub async fn states(store: &RecordStore) -> Vec<RecordState> {
    store.snapshot().await.into_iter().map(|r| r.state).collect()
}
