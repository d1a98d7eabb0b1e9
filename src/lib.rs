//! # project-harvest
//!
//! Crash-safe job core for collecting project records and downloading their
//! artifacts.
//!
//! ## Design Philosophy
//!
//! project-harvest is designed to be:
//! - **Durable** - Every state change is written to disk before the next step
//! - **Restart-safe** - Records interrupted by a crash are picked up again
//! - **Library-first** - No CLI or UI; the caller supplies the collaborators
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! ## Record lifecycle
//!
//! ```text
//! Pending ──> InProgress ──> Completed
//!    ^            │
//!    └────────────┤
//!    ^            └─────────> Failed
//!    └─────────────────────────┘ (requeue)
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use async_trait::async_trait;
//! use project_harvest::{
//!     ArtifactFetcher, ArtifactLayout, BatchProcessor, Config, Downloader, MetadataExtractor,
//!     ProjectMetadata, Record, RecordStore, TransferError,
//! };
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! struct Extractor;
//!
//! #[async_trait]
//! impl MetadataExtractor for Extractor {
//!     async fn extract(&self, record: &Record) -> project_harvest::Result<ProjectMetadata> {
//!         Ok(ProjectMetadata {
//!             project_name: Some(record.name.clone()),
//!             ..Default::default()
//!         })
//!     }
//!     fn name(&self) -> &'static str { "example" }
//! }
//!
//! struct Fetcher;
//!
//! #[async_trait]
//! impl ArtifactFetcher for Fetcher {
//!     async fn fetch(&self, _record: &Record, dir: &Path) -> Result<bool, TransferError> {
//!         tokio::fs::write(dir.join("files.zip"), b"...").await?;
//!         Ok(true)
//!     }
//!     fn name(&self) -> &'static str { "example" }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.apply_env_overrides();
//!     config.validate()?;
//!
//!     let store = Arc::new(RecordStore::load(&config.persistence.store_path).await);
//!     let downloader = Downloader::new(
//!         Arc::new(Fetcher),
//!         config.retry.clone(),
//!         config.disk_space.clone(),
//!     );
//!     let processor = BatchProcessor::new(
//!         store,
//!         ArtifactLayout::new(&config),
//!         Arc::new(Extractor),
//!         downloader,
//!     );
//!
//!     // Subscribe to events
//!     let mut events = processor.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let summary = processor.run(None).await?;
//!     println!("completed {} of {}", summary.completed, summary.processed);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Artifact directory layout and metadata files
pub mod artifacts;
/// Interfaces to the record source, metadata extractor and artifact fetcher
pub mod collaborators;
/// Configuration types
pub mod config;
/// Artifact transfer with disk preflight and retry
pub mod downloader;
/// Error types
pub mod error;
/// Collector-side ingest into the store
pub mod ingest;
/// Batch processing state machine
pub mod processor;
/// Retry logic with backoff
pub mod retry;
/// Durable record store
pub mod store;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use artifacts::{ArtifactLayout, slugify};
pub use collaborators::{ArtifactFetcher, MetadataExtractor, RecordSource};
pub use config::Config;
pub use downloader::Downloader;
pub use error::{Error, Result, StoreError, TransferError};
pub use ingest::{IngestSummary, ingest_from};
pub use processor::BatchProcessor;
pub use store::{LoadStatus, RecordStore};
pub use types::{
    BatchEnd, BatchSummary, ClientContact, Event, IncomingRecord, ProjectMetadata, Record,
    RecordId, RecordOutcome, RecordState,
};
