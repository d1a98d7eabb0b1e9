//! Configuration types for project-harvest
//!
//! Configuration is an explicit value handed to each component's constructor;
//! nothing in the crate reads process-wide settings on its own.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides [`PersistenceConfig::data_dir`]
pub const DATA_DIR_ENV: &str = "PROJECT_HARVEST_DATA_DIR";

/// Where the record store and artifacts live on disk
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Record store file (default: "./store/pending_projects.json")
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Root directory for artifact directories (default: "./data")
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            data_dir: default_data_dir(),
        }
    }
}

/// Retry configuration for cancelled transfers
///
/// `max_attempts` counts every attempt, including the first one.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total number of transfer attempts (default: 2, i.e. one retry)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (default: 2000 ms)
    #[serde(default = "default_initial_delay", with = "duration_ms_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_ms_serde")]
    pub max_delay: Duration,

    /// Multiplier applied to the delay after each retry (default: 1.0, fixed backoff)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

/// Disk space preflight before each transfer
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiskSpaceConfig {
    /// Enable disk space checking (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Minimum free space required to start a transfer (default: 1 GB)
    #[serde(default = "default_min_free_space")]
    pub min_free_space: u64,
}

impl Default for DiskSpaceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_free_space: default_min_free_space(),
        }
    }
}

/// Artifact directory layout
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Subdirectory of `data_dir` holding one directory per record (default: "projects")
    #[serde(default = "default_projects_subdir")]
    pub projects_subdir: PathBuf,

    /// Maximum slug length in directory names (default: 60)
    #[serde(default = "default_slug_max_len")]
    pub slug_max_len: usize,

    /// Write a metadata text file into each artifact directory (default: true)
    #[serde(default = "default_true")]
    pub write_metadata_file: bool,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            projects_subdir: default_projects_subdir(),
            slug_max_len: default_slug_max_len(),
            write_metadata_file: true,
        }
    }
}

/// Main configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Store file and data directory locations
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Transfer retry policy
    #[serde(default)]
    pub retry: RetryConfig,

    /// Disk space preflight
    #[serde(default)]
    pub disk_space: DiskSpaceConfig,

    /// Artifact directory layout
    #[serde(default)]
    pub artifacts: ArtifactConfig,
}

impl Config {
    /// Load configuration from a JSON file
    ///
    /// Missing fields fall back to their defaults. The result is validated.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("failed to parse {}: {}", path.display(), e),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides ([`DATA_DIR_ENV`])
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV)
            && !dir.trim().is_empty()
        {
            tracing::debug!(data_dir = %dir, "data directory overridden from environment");
            self.persistence.data_dir = PathBuf::from(dir);
        }
    }

    /// Check that the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(Error::Config {
                message: "max_attempts must be at least 1".to_string(),
                key: Some("retry.max_attempts".to_string()),
            });
        }
        if !self.retry.backoff_multiplier.is_finite() || self.retry.backoff_multiplier < 1.0 {
            return Err(Error::Config {
                message: "backoff_multiplier must be a finite number >= 1.0".to_string(),
                key: Some("retry.backoff_multiplier".to_string()),
            });
        }
        if self.artifacts.slug_max_len == 0 {
            return Err(Error::Config {
                message: "slug_max_len must be at least 1".to_string(),
                key: Some("artifacts.slug_max_len".to_string()),
            });
        }
        if self.persistence.store_path.as_os_str().is_empty() {
            return Err(Error::Config {
                message: "store_path must not be empty".to_string(),
                key: Some("persistence.store_path".to_string()),
            });
        }
        Ok(())
    }

    /// Directory holding one artifact directory per record
    pub fn projects_dir(&self) -> PathBuf {
        self.persistence
            .data_dir
            .join(&self.artifacts.projects_subdir)
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("./store/pending_projects.json")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_projects_subdir() -> PathBuf {
    PathBuf::from("projects")
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    2
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(2000)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

fn default_min_free_space() -> u64 {
    1024 * 1024 * 1024
}

fn default_slug_max_len() -> usize {
    60
}

// Duration serialization helper (milliseconds)
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
