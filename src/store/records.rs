//! Record upserts, queries and state transitions.

use tracing::{debug, info, warn};

use super::RecordStore;
use crate::error::{Result, StoreError};
use crate::types::{IncomingRecord, Record, RecordId, RecordState};

impl RecordStore {
    /// Insert new records and refresh existing ones, keyed by `key`
    ///
    /// Existing records keep their `id` and `state`; their `name` and
    /// `due_date` are replaced when the incoming value is non-empty. New keys
    /// are appended as `Pending` with the next id. Items with an empty key
    /// are skipped.
    ///
    /// The file is written once per call, and only if something was added or
    /// changed. On a write failure the in-memory changes are kept and the
    /// error is returned.
    ///
    /// Returns the number of newly added records. Once the id space is used
    /// up, whatever was applied so far is persisted and
    /// `StoreError::IdsExhausted` is returned.
    pub async fn upsert_many(&self, incoming: &[IncomingRecord]) -> Result<usize> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let mut last_id = state.max_id();
        let mut exhausted = false;
        let mut added = 0;
        let mut updated = 0;

        for item in incoming {
            let key = item.key.trim();
            if key.is_empty() {
                debug!(name = %item.name, "skipping incoming record without key");
                continue;
            }

            if let Some(&pos) = state.index.get(key) {
                let existing = &mut state.records[pos];
                let mut changed = false;

                if !item.name.is_empty() && existing.name != item.name {
                    existing.name = item.name.clone();
                    changed = true;
                }
                if !item.due_date.is_empty() && existing.due_date != item.due_date {
                    existing.due_date = item.due_date.clone();
                    changed = true;
                }

                if changed {
                    debug!(record_id = existing.id.0, key, "record refreshed");
                    updated += 1;
                }
            } else {
                let Some(id) = last_id.next() else {
                    warn!(last_id = last_id.0, key, "record ids exhausted, not adding");
                    exhausted = true;
                    break;
                };
                last_id = id;
                let mut record = Record::new(id, item);
                record.key = key.to_string();

                debug!(record_id = record.id.0, key, "record added");
                state.index.insert(record.key.clone(), state.records.len());
                state.records.push(record);
                added += 1;
            }
        }

        if added > 0 || updated > 0 {
            self.persist(&state.records).await?;
        }

        info!(
            incoming = incoming.len(),
            added,
            updated,
            total = state.records.len(),
            "upsert complete"
        );
        if exhausted {
            return Err(StoreError::IdsExhausted { last: last_id }.into());
        }
        Ok(added)
    }

    /// Get a record by id
    pub async fn get_by_id(&self, id: RecordId) -> Option<Record> {
        let state = self.state.lock().await;
        state
            .position_of(id)
            .map(|pos| state.records[pos].clone())
    }

    /// Get a record by its natural key
    pub async fn get_by_key(&self, key: &str) -> Option<Record> {
        let state = self.state.lock().await;
        state
            .index
            .get(key.trim())
            .map(|&pos| state.records[pos].clone())
    }

    /// Pending records, in insertion order
    pub async fn get_pending(&self) -> Vec<Record> {
        let state = self.state.lock().await;
        state
            .records
            .iter()
            .filter(|r| r.is_pending())
            .cloned()
            .collect()
    }

    /// First pending record in insertion order
    pub async fn first_pending(&self) -> Option<Record> {
        let state = self.state.lock().await;
        state.records.iter().find(|r| r.is_pending()).cloned()
    }

    /// Copy of every record, in insertion order
    pub async fn snapshot(&self) -> Vec<Record> {
        self.state.lock().await.records.clone()
    }

    /// Number of records
    pub async fn len(&self) -> usize {
        self.state.lock().await.records.len()
    }

    /// Whether the store holds no records
    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.records.is_empty()
    }

    /// Number of records in `state`
    pub async fn count_by_state(&self, state: RecordState) -> usize {
        self.state
            .lock()
            .await
            .records
            .iter()
            .filter(|r| r.state == state)
            .count()
    }

    /// Move a record to `new_state` and persist immediately
    ///
    /// Returns `Ok(false)` if no record has `id`. A transition outside the
    /// lifecycle graph is rejected without touching the record. Re-asserting
    /// the current state is a no-op. If the write fails the new state is kept
    /// in memory and `StoreError::PersistFailed` is returned; the next
    /// successful write will carry it to disk.
    pub async fn set_state(&self, id: RecordId, new_state: RecordState) -> Result<bool> {
        let mut state = self.state.lock().await;

        let Some(pos) = state.position_of(id) else {
            warn!(record_id = id.0, %new_state, "cannot set state of unknown record");
            return Ok(false);
        };

        let current = state.records[pos].state;
        if current == new_state {
            return Ok(true);
        }
        if !current.can_transition_to(new_state) {
            return Err(StoreError::InvalidTransition {
                id,
                from: current,
                to: new_state,
            }
            .into());
        }

        state.records[pos].state = new_state;
        debug!(record_id = id.0, from = %current, to = %new_state, "state changed");

        self.persist(&state.records).await?;
        Ok(true)
    }

    /// Revert every `InProgress` record to `Pending`
    ///
    /// A record can only be `InProgress` at startup if a previous run died
    /// mid-record. Returns the number of records reverted.
    pub async fn reset_interrupted(&self) -> Result<usize> {
        let mut state = self.state.lock().await;

        let mut reverted = 0;
        for record in state
            .records
            .iter_mut()
            .filter(|r| r.state == RecordState::InProgress)
        {
            warn!(record_id = record.id.0, name = %record.name, "reverting interrupted record to pending");
            record.state = RecordState::Pending;
            reverted += 1;
        }

        if reverted > 0 {
            self.persist(&state.records).await?;
        }
        Ok(reverted)
    }

    /// Put a `Failed` record back in the queue
    ///
    /// Returns `Ok(false)` if no record has `id`; errors if the record is not
    /// `Failed`.
    pub async fn requeue_failed(&self, id: RecordId) -> Result<bool> {
        let current = {
            let state = self.state.lock().await;
            match state.position_of(id) {
                Some(pos) => state.records[pos].state,
                None => return Ok(false),
            }
        };

        if current != RecordState::Failed {
            return Err(StoreError::InvalidTransition {
                id,
                from: current,
                to: RecordState::Pending,
            }
            .into());
        }

        info!(record_id = id.0, "requeueing failed record");
        self.set_state(id, RecordState::Pending).await
    }
}
