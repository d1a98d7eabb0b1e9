//! Core types for project-harvest

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Unique identifier for a record
///
/// Assigned by the [`RecordStore`](crate::store::RecordStore) in strictly
/// increasing order and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl RecordId {
    /// Create a new RecordId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }

    /// The id following this one, or `None` once the id space is used up
    pub fn next(&self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<RecordId> for i64 {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

impl PartialEq<i64> for RecordId {
    fn eq(&self, other: &i64) -> bool {
        self.0 == *other
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RecordId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Lifecycle state of a record
///
/// The persisted tags are the snake_case variant names. Tags written by the
/// older Spanish-language tooling are accepted on read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    /// Waiting to be processed
    #[default]
    #[serde(alias = "pendiente")]
    Pending,
    /// Being processed by the batch processor
    #[serde(alias = "en-proceso")]
    InProgress,
    /// Metadata captured and artifacts downloaded
    #[serde(alias = "descargado")]
    Completed,
    /// Parked after repeated cancelled transfers
    #[serde(alias = "error")]
    Failed,
}

impl RecordState {
    /// Whether moving from `self` to `next` is part of the lifecycle graph
    ///
    /// `Pending → InProgress`, `InProgress → Completed | Failed | Pending`,
    /// and `Failed → Pending` (operator requeue). `Completed` is terminal.
    /// Re-asserting the current state is always allowed.
    pub fn can_transition_to(&self, next: RecordState) -> bool {
        use RecordState::*;

        if *self == next {
            return true;
        }

        matches!(
            (self, next),
            (Pending, InProgress)
                | (InProgress, Completed)
                | (InProgress, Failed)
                | (InProgress, Pending)
                | (Failed, Pending)
        )
    }

    /// Persisted tag for this state
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordState::Pending => "pending",
            RecordState::InProgress => "in_progress",
            RecordState::Completed => "completed",
            RecordState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RecordState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of work tracked through the pipeline
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Store-assigned identifier
    pub id: RecordId,
    /// Natural identity from the source (e.g. project URL)
    pub key: String,
    /// Display name
    pub name: String,
    /// Due date as reported by the source
    pub due_date: String,
    /// Current lifecycle state
    pub state: RecordState,
}

impl Record {
    /// Create a new pending record
    pub fn new(id: RecordId, incoming: &IncomingRecord) -> Self {
        Self {
            id,
            key: incoming.key.clone(),
            name: incoming.name.clone(),
            due_date: incoming.due_date.clone(),
            state: RecordState::Pending,
        }
    }

    /// Whether this record can be selected for processing
    pub fn is_pending(&self) -> bool {
        self.state == RecordState::Pending
    }
}

/// A record as discovered by a collector, before it has an id
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingRecord {
    /// Natural identity (e.g. project URL)
    #[serde(alias = "url")]
    pub key: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Due date as reported by the source
    #[serde(default)]
    pub due_date: String,
}

impl IncomingRecord {
    /// Convenience constructor
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        due_date: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            due_date: due_date.into(),
        }
    }
}

/// Client contact details captured from a project page
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientContact {
    /// Company or contact name
    pub name: Option<String>,
    /// Contact email
    pub email: Option<String>,
    /// Contact phone
    pub phone: Option<String>,
}

/// Descriptive metadata returned by a [`MetadataExtractor`](crate::collaborators::MetadataExtractor)
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Client contact details
    #[serde(default)]
    pub client: ClientContact,
    /// Due date as shown on the project page
    pub date_due: Option<String>,
    /// Primary descriptive field; required for a successful capture
    pub project_name: Option<String>,
    /// Project location
    pub location: Option<String>,
    /// Project size
    pub project_size: Option<String>,
    /// Free-form project information
    pub project_information: Option<String>,
}

impl ProjectMetadata {
    /// A capture is ok when the primary field is present and non-blank
    pub fn is_ok(&self) -> bool {
        self.project_name
            .as_deref()
            .is_some_and(|name| !name.trim().is_empty())
    }
}

/// Outcome of processing a single record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOutcome {
    /// Metadata and artifacts captured; record is `Completed`
    Completed,
    /// Transfer cancelled after all retries; record is `Failed`, batch continues
    Skipped,
    /// Any other failure; record reverted to `Pending`, batch stops
    Aborted,
}

/// Why a batch run ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum BatchEnd {
    /// No eligible record remained
    Exhausted,
    /// A record failed in a way that must not be retried in a tight loop
    Aborted {
        /// Record that stopped the batch
        id: RecordId,
    },
    /// The preferred record did not exist or was not pending
    PreferredUnavailable {
        /// The requested record id
        id: RecordId,
    },
}

/// Totals for one batch run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Records taken through the per-record algorithm
    pub processed: usize,
    /// Records that reached `Completed`
    pub completed: usize,
    /// Records parked as `Failed`
    pub skipped: usize,
    /// Records reverted to `Pending` (at most one per run)
    pub aborted: usize,
    /// Pending records left in the store when the run ended
    pub remaining_pending: usize,
    /// Why the run ended
    pub end: BatchEnd,
}

/// Event emitted during a batch run
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A record moved to `InProgress`
    RecordStarted {
        /// Record ID
        id: RecordId,
        /// Record name
        name: String,
    },

    /// A record reached `Completed`
    RecordCompleted {
        /// Record ID
        id: RecordId,
        /// Artifact directory kept for the record
        path: PathBuf,
    },

    /// A record was parked as `Failed`
    RecordFailed {
        /// Record ID
        id: RecordId,
        /// Error message
        error: String,
    },

    /// A record was reverted to `Pending`
    RecordReverted {
        /// Record ID
        id: RecordId,
        /// Why the attempt did not complete
        reason: String,
    },

    /// The batch run ended
    BatchFinished {
        /// Run totals
        summary: BatchSummary,
    },
}
