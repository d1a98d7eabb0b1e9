//! Artifact transfer with disk preflight and bounded retry
//!
//! [`Downloader`] wraps an [`ArtifactFetcher`] and applies the transfer
//! policy: check free space first, retry cancellations a bounded number of
//! times, surface resource exhaustion untouched, and turn any other failure
//! into a plain `false`.

use crate::collaborators::ArtifactFetcher;
use crate::config::{DiskSpaceConfig, RetryConfig};
use crate::error::{Error, TransferError};
use crate::retry::retry_with_backoff;
use crate::types::Record;
use crate::utils;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Retrying front end for an [`ArtifactFetcher`]
#[derive(Clone)]
pub struct Downloader {
    fetcher: Arc<dyn ArtifactFetcher>,
    retry: RetryConfig,
    disk: DiskSpaceConfig,
}

impl std::fmt::Debug for Downloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downloader")
            .field("fetcher", &self.fetcher.name())
            .field("retry", &self.retry)
            .field("disk", &self.disk)
            .finish()
    }
}

impl Downloader {
    /// Create a downloader around `fetcher`
    pub fn new(fetcher: Arc<dyn ArtifactFetcher>, retry: RetryConfig, disk: DiskSpaceConfig) -> Self {
        Self {
            fetcher,
            retry,
            disk,
        }
    }

    /// Transfer `record`'s artifacts into `dir`
    ///
    /// - `Ok(true)`: artifacts are in place.
    /// - `Ok(false)`: the transfer failed without a classified error, or with
    ///   [`TransferError::Generic`]. Not retried.
    /// - `Err(Cancelled)`: every attempt was cancelled.
    /// - `Err(ResourceExhausted)`: the disk is too full, either found by the
    ///   preflight check or reported by the fetcher. Never retried.
    pub async fn download(&self, record: &Record, dir: &Path) -> Result<bool, TransferError> {
        self.preflight(record, dir)?;

        debug!(
            record_id = record.id.0,
            fetcher = self.fetcher.name(),
            max_attempts = self.retry.max_attempts,
            ?dir,
            "starting transfer"
        );

        let result = retry_with_backoff(&self.retry, || self.fetcher.fetch(record, dir)).await;

        match result {
            Ok(true) => {
                info!(record_id = record.id.0, "transfer complete");
                Ok(true)
            }
            Ok(false) => {
                warn!(record_id = record.id.0, "transfer reported failure");
                Ok(false)
            }
            Err(TransferError::Generic(msg)) => {
                warn!(record_id = record.id.0, error = %msg, "transfer failed");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Refuse to start a transfer when free space is below the threshold
    fn preflight(&self, record: &Record, dir: &Path) -> Result<(), TransferError> {
        if !self.disk.enabled {
            return Ok(());
        }

        match utils::check_free_space(dir, self.disk.min_free_space) {
            Ok(available) => {
                debug!(record_id = record.id.0, available, "disk space ok");
                Ok(())
            }
            Err(Error::InsufficientSpace {
                required,
                available,
            }) => {
                warn!(
                    record_id = record.id.0,
                    required, available, "not enough disk space for transfer"
                );
                Err(TransferError::ResourceExhausted(format!(
                    "need {required} bytes free, have {available}"
                )))
            }
            Err(e) => {
                // The fetcher will hit the real limit if there is one
                warn!(record_id = record.id.0, error = %e, "disk space check failed, continuing");
                Ok(())
            }
        }
    }
}
