
use crate::store::RecordStore;
use crate::types::IncomingRecord;
use tempfile::TempDir;

/// Fresh store in a temp dir; keep the TempDir alive for the test's duration.
async fn empty_store() -> (RecordStore, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = RecordStore::load(dir.path().join("store").join("pending_projects.json")).await;
    (store, dir)
}

fn incoming(key: &str, name: &str, due_date: &str) -> IncomingRecord {
    IncomingRecord::new(key, name, due_date)
}

/// Parse the store file straight from disk.
async fn read_file(store: &RecordStore) -> serde_json::Value {
    let raw = tokio::fs::read_to_string(store.path()).await.unwrap();
    serde_json::from_str(&raw).unwrap()
}
