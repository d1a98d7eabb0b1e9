//! Test configuration helpers

use project_harvest::{
    ArtifactFetcher, ArtifactLayout, BatchProcessor, Config, Downloader, MetadataExtractor,
    RecordStore,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Config rooted in `dir` with fast retries and no disk preflight
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.persistence.store_path = dir.join("store").join("pending_projects.json");
    config.persistence.data_dir = dir.join("data");
    config.retry.initial_delay = Duration::from_millis(1);
    config.retry.max_delay = Duration::from_millis(10);
    config.disk_space.enabled = false;
    config
}

/// Everything a test needs to drive batches against one temp directory
pub struct TestEnv {
    /// Config used to build the processor
    pub config: Config,
    /// Store shared with the processor
    pub store: Arc<RecordStore>,
    /// Keeps the temp dir alive
    pub temp_dir: TempDir,
}

impl TestEnv {
    /// Fresh environment with an empty store
    pub async fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
        let config = test_config(temp_dir.path());
        let store = Arc::new(RecordStore::load(&config.persistence.store_path).await);
        Self {
            config,
            store,
            temp_dir,
        }
    }

    /// Build a processor over this environment's store
    pub fn processor(
        &self,
        extractor: Arc<dyn MetadataExtractor>,
        fetcher: Arc<dyn ArtifactFetcher>,
    ) -> BatchProcessor {
        let downloader = Downloader::new(
            fetcher,
            self.config.retry.clone(),
            self.config.disk_space.clone(),
        );
        BatchProcessor::new(
            self.store.clone(),
            ArtifactLayout::new(&self.config),
            extractor,
            downloader,
        )
    }

    /// Reopen the store from disk, as a new process would
    pub async fn reopen(&mut self) {
        self.store = Arc::new(RecordStore::load(&self.config.persistence.store_path).await);
    }

    /// Artifact layout for this environment
    pub fn layout(&self) -> ArtifactLayout {
        ArtifactLayout::new(&self.config)
    }
}
