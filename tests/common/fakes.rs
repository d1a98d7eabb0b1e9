//! Scripted collaborators

use async_trait::async_trait;
use project_harvest::{
    ArtifactFetcher, Error, IncomingRecord, MetadataExtractor, ProjectMetadata, Record,
    RecordSource, Result, TransferError,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

/// What a single fetch attempt does
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transfer {
    /// Write artifacts and report success
    Ok,
    /// Report failure without an error
    Fail,
    /// Leave a partial file and report a cancellation
    Cancelled,
    /// Leave a partial file and report a full disk
    Exhausted,
    /// Report an unclassified error
    Generic,
}

/// Fetcher that follows a per-record-name script, then falls back to a default
pub struct ScriptedFetcher {
    default: Transfer,
    scripts: Mutex<HashMap<String, VecDeque<Transfer>>>,
    calls: AtomicU32,
    seen: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    /// Every fetch succeeds unless scripted otherwise
    pub fn new() -> Self {
        Self::with_default(Transfer::Ok)
    }

    /// Unscripted fetches behave like `default`
    pub fn with_default(default: Transfer) -> Self {
        Self {
            default,
            scripts: Mutex::new(HashMap::new()),
            calls: AtomicU32::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Queue `steps` for the record named `name`
    pub fn script(self, name: &str, steps: &[Transfer]) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(name.to_string(), steps.iter().copied().collect());
        self
    }

    /// Replace the remaining script for `name`
    pub fn rescript(&self, name: &str, steps: &[Transfer]) {
        self.scripts
            .lock()
            .unwrap()
            .insert(name.to_string(), steps.iter().copied().collect());
    }

    /// Total fetch attempts
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Record names in the order they were fetched, one entry per attempt
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    fn next_step(&self, name: &str) -> Transfer {
        self.scripts
            .lock()
            .unwrap()
            .get_mut(name)
            .and_then(|steps| steps.pop_front())
            .unwrap_or(self.default)
    }
}

#[async_trait]
impl ArtifactFetcher for ScriptedFetcher {
    async fn fetch(&self, record: &Record, dir: &Path) -> std::result::Result<bool, TransferError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(record.name.clone());

        match self.next_step(&record.name) {
            Transfer::Ok => {
                let specs = dir.join("specs");
                tokio::fs::create_dir_all(&specs).await?;
                tokio::fs::write(dir.join("drawings.pdf"), b"%PDF-1.7 drawings").await?;
                tokio::fs::write(specs.join("section-01.pdf"), b"%PDF-1.7 specs").await?;
                Ok(true)
            }
            Transfer::Fail => Ok(false),
            Transfer::Cancelled => {
                tokio::fs::write(dir.join("bundle.zip.part"), b"PK").await?;
                Err(TransferError::Cancelled("download canceled".into()))
            }
            Transfer::Exhausted => {
                tokio::fs::write(dir.join("bundle.zip.part"), b"PK").await?;
                Err(TransferError::ResourceExhausted(
                    "no space left on device".into(),
                ))
            }
            Transfer::Generic => Err(TransferError::Generic("http 502".into())),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Extractor that echoes the record name, with configurable gaps and failures
#[derive(Default)]
pub struct ScriptedExtractor {
    blank: Mutex<HashSet<String>>,
    failing: Mutex<HashSet<String>>,
}

impl ScriptedExtractor {
    /// Every record yields a project name
    pub fn new() -> Self {
        Self::default()
    }

    /// Records named `name` yield no project name
    pub fn blank_for(self, name: &str) -> Self {
        self.blank.lock().unwrap().insert(name.to_string());
        self
    }

    /// Records named `name` make the extractor fail
    pub fn failing_for(self, name: &str) -> Self {
        self.failing.lock().unwrap().insert(name.to_string());
        self
    }

    /// Stop blanking or failing `name`
    pub fn heal(&self, name: &str) {
        self.blank.lock().unwrap().remove(name);
        self.failing.lock().unwrap().remove(name);
    }
}

#[async_trait]
impl MetadataExtractor for ScriptedExtractor {
    async fn extract(&self, record: &Record) -> Result<ProjectMetadata> {
        if self.failing.lock().unwrap().contains(&record.name) {
            return Err(Error::Other(format!("no info page for {}", record.name)));
        }
        if self.blank.lock().unwrap().contains(&record.name) {
            return Ok(ProjectMetadata::default());
        }
        Ok(ProjectMetadata {
            project_name: Some(record.name.clone()),
            date_due: Some(record.due_date.clone()),
            location: Some("Windsor, ON".to_string()),
            ..Default::default()
        })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Source that returns a fixed list
pub struct ListSource(pub Vec<IncomingRecord>);

impl ListSource {
    /// Records named `names`, keyed by a URL derived from the name
    pub fn named(names: &[&str]) -> Self {
        Self(
            names
                .iter()
                .map(|name| {
                    IncomingRecord::new(
                        format!("https://bids.example.com/projects/{}", name.to_lowercase()),
                        *name,
                        "2026-11-30",
                    )
                })
                .collect(),
        )
    }
}

#[async_trait]
impl RecordSource for ListSource {
    async fn collect(&self) -> Result<Vec<IncomingRecord>> {
        Ok(self.0.clone())
    }

    fn name(&self) -> &'static str {
        "list"
    }
}
