//! Error types for project-harvest
//!
//! This module provides:
//! - The transfer error taxonomy ([`TransferError`]) that drives retry and abort decisions
//! - Record store errors ([`StoreError`])
//! - The crate-wide [`Error`] and [`Result`] alias
//! - Machine-readable error codes for logging and alerting

use crate::types::{RecordId, RecordState};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for project-harvest operations
pub type Result<T> = std::result::Result<T, Error>;

/// errno for "No space left on device"
#[cfg(unix)]
const ENOSPC: i32 = 28;

/// `ERROR_HANDLE_DISK_FULL` and `ERROR_DISK_FULL`
#[cfg(windows)]
const DISK_FULL_CODES: [i32; 2] = [39, 112];

/// Main error type for project-harvest
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "data_dir")
        key: Option<String>,
    },

    /// Record store error
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Artifact transfer error
    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Insufficient disk space
    #[error("insufficient disk space: need {required} bytes, have {available} bytes")]
    InsufficientSpace {
        /// Number of bytes required for the operation
        required: u64,
        /// Number of bytes currently available on disk
        available: u64,
    },

    /// Failed to check disk space
    #[error("failed to check disk space: {0}")]
    DiskSpaceCheckFailed(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Store(StoreError::InvalidTransition { .. }) => "invalid_transition",
            Error::Store(StoreError::PersistFailed { .. }) => "persist_failed",
            Error::Store(StoreError::NotFound { .. }) => "not_found",
            Error::Store(StoreError::IdsExhausted { .. }) => "ids_exhausted",
            Error::Transfer(e) => e.error_code(),
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::InsufficientSpace { .. } => "insufficient_space",
            Error::DiskSpaceCheckFailed(_) => "disk_space_check_failed",
            Error::Other(_) => "internal_error",
        }
    }

    /// Whether this error must halt the whole run
    ///
    /// True for a classified transfer exhaustion, a failed disk preflight, and
    /// local writes that hit a full disk or quota.
    pub fn is_resource_exhausted(&self) -> bool {
        match self {
            Error::Transfer(e) => e.is_resource_exhausted(),
            Error::InsufficientSpace { .. } => true,
            Error::Io(e) => is_storage_full(e),
            _ => false,
        }
    }
}

/// Record store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Requested state change is not part of the lifecycle graph
    #[error("record {id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// The record whose state change was rejected
        id: RecordId,
        /// Current state
        from: RecordState,
        /// Requested state
        to: RecordState,
    },

    /// Writing the store file failed; the in-memory change was kept
    #[error("failed to persist store to {path}: {reason}")]
    PersistFailed {
        /// Store file path
        path: PathBuf,
        /// The underlying failure
        reason: String,
    },

    /// Every id up to `i64::MAX` has been handed out
    #[error("no record ids left after {last}")]
    IdsExhausted {
        /// The highest id in the store
        last: RecordId,
    },

    /// Record not found
    #[error("record {id} not found")]
    NotFound {
        /// The record id that was not found
        id: RecordId,
    },
}

/// Failure classification for one artifact transfer
///
/// - [`Cancelled`](TransferError::Cancelled) is transient and retried.
/// - [`ResourceExhausted`](TransferError::ResourceExhausted) is fatal and never retried.
/// - [`Generic`](TransferError::Generic) is reported as a plain failure result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// The transfer was aborted by the environment
    #[error("transfer cancelled: {0}")]
    Cancelled(String),

    /// The local environment cannot accept the artifact (e.g. disk full)
    #[error("resources exhausted: {0}")]
    ResourceExhausted(String),

    /// Any other transfer failure
    #[error("transfer failed: {0}")]
    Generic(String),
}

impl TransferError {
    /// Whether this is a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransferError::Cancelled(_))
    }

    /// Whether this is a fatal resource exhaustion
    pub fn is_resource_exhausted(&self) -> bool {
        matches!(self, TransferError::ResourceExhausted(_))
    }

    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            TransferError::Cancelled(_) => "transfer_cancelled",
            TransferError::ResourceExhausted(_) => "resource_exhausted",
            TransferError::Generic(_) => "transfer_failed",
        }
    }
}

fn is_storage_full(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::StorageFull | std::io::ErrorKind::QuotaExceeded
    ) || is_disk_full_code(e.raw_os_error())
}

#[cfg(unix)]
fn is_disk_full_code(code: Option<i32>) -> bool {
    code == Some(ENOSPC)
}

#[cfg(windows)]
fn is_disk_full_code(code: Option<i32>) -> bool {
    code.is_some_and(|c| DISK_FULL_CODES.contains(&c))
}

#[cfg(not(any(unix, windows)))]
fn is_disk_full_code(_code: Option<i32>) -> bool {
    false
}

impl From<std::io::Error> for TransferError {
    fn from(e: std::io::Error) -> Self {
        if is_storage_full(&e) {
            TransferError::ResourceExhausted(e.to_string())
        } else {
            TransferError::Generic(e.to_string())
        }
    }
}
