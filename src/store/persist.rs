//! Atomic store writes.

use std::ffi::OsString;
use std::path::PathBuf;

use super::RecordStore;
use crate::error::StoreError;
use crate::types::Record;

impl RecordStore {
    /// Overwrite the store file with `records`
    ///
    /// Writes a sibling temp file and renames it over the target, so readers
    /// only ever see the previous or the new contents.
    pub(super) async fn persist(&self, records: &[Record]) -> Result<(), StoreError> {
        let failed = |reason: String| StoreError::PersistFailed {
            path: self.path.clone(),
            reason,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| failed(format!("failed to create store directory: {e}")))?;
        }

        let json = serde_json::to_vec_pretty(records)
            .map_err(|e| failed(format!("failed to serialize records: {e}")))?;

        let tmp_path = self.temp_path();
        tokio::fs::write(&tmp_path, &json)
            .await
            .map_err(|e| failed(format!("failed to write {}: {e}", tmp_path.display())))?;

        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            tokio::fs::remove_file(&tmp_path).await.ok();
            return Err(failed(format!("failed to replace store file: {e}")));
        }

        tracing::debug!(
            path = %self.path.display(),
            records = records.len(),
            "store persisted"
        );
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }
}
