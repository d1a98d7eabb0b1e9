//! Seams to the outside world
//!
//! The core never talks to a website, a browser or a remote API itself. It
//! drives three collaborators supplied by the caller: a [`RecordSource`] that
//! discovers records, a [`MetadataExtractor`] that captures descriptive
//! fields for one record, and an [`ArtifactFetcher`] that transfers a
//! record's files into its artifact directory. Timeouts are the
//! collaborator's business.

use crate::error::{Result, TransferError};
use crate::types::{IncomingRecord, ProjectMetadata, Record};
use async_trait::async_trait;
use std::path::Path;

/// Captures descriptive metadata for a record
///
/// # Examples
///
/// ```no_run
/// use async_trait::async_trait;
/// use project_harvest::collaborators::MetadataExtractor;
/// use project_harvest::types::{ProjectMetadata, Record};
///
/// struct NameOnly;
///
/// #[async_trait]
/// impl MetadataExtractor for NameOnly {
///     async fn extract(&self, record: &Record) -> project_harvest::Result<ProjectMetadata> {
///         Ok(ProjectMetadata {
///             project_name: Some(record.name.clone()),
///             ..Default::default()
///         })
///     }
///
///     fn name(&self) -> &'static str {
///         "name-only"
///     }
/// }
/// ```
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    /// Capture metadata for `record`
    ///
    /// A capture without a `project_name` is not an error; it is reported
    /// through [`ProjectMetadata::is_ok`] and the record is not completed.
    /// Returning an error whose
    /// [`is_resource_exhausted`](crate::Error::is_resource_exhausted) is true
    /// stops the whole batch.
    async fn extract(&self, record: &Record) -> Result<ProjectMetadata>;

    /// Name of this implementation, for logs
    fn name(&self) -> &'static str;
}

/// Transfers a record's artifacts into a directory
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Fetch every artifact of `record` into `dir`
    ///
    /// `Ok(true)` means the artifacts are in place, `Ok(false)` is a plain
    /// failure with nothing to classify. Errors must use the
    /// [`TransferError`] taxonomy: `Cancelled` is retried, `ResourceExhausted`
    /// stops the batch and `Generic` is reported as a failed transfer.
    async fn fetch(&self, record: &Record, dir: &Path) -> std::result::Result<bool, TransferError>;

    /// Name of this implementation, for logs
    fn name(&self) -> &'static str;
}

/// Discovers records to feed into the store
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Collect the records currently visible at the source
    async fn collect(&self) -> Result<Vec<IncomingRecord>>;

    /// Name of this implementation, for logs
    fn name(&self) -> &'static str;
}
