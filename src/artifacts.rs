//! Artifact directory layout
//!
//! Each record gets its own directory under `{data_dir}/{projects_subdir}`,
//! named `{id:03}_{slug}`. The directory is created at the start of a
//! processing attempt, kept when the record completes and removed wholesale
//! on every other outcome.

use crate::config::Config;
use crate::error::Result;
use crate::types::{ProjectMetadata, Record, RecordId};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Slug used when a name yields nothing usable
pub const FALLBACK_SLUG: &str = "project";

/// Number of leading words kept in a slug
const SLUG_WORDS: usize = 3;

// Literal patterns; compilation is covered by the slug tests.
#[allow(clippy::expect_used)]
fn separator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[-_,:/\\()]+").expect("valid separator pattern"))
}

#[allow(clippy::expect_used)]
fn disallowed_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_\-]").expect("valid slug pattern"))
}

/// Turn a display name into a filesystem-safe slug
///
/// Separators (`-_,:/\()`) become spaces, whitespace is collapsed, the first
/// three words are joined with `-`, anything outside `[A-Za-z0-9_-]` is
/// dropped and the result is cut to `max_len` characters. Names that leave
/// nothing behind map to [`FALLBACK_SLUG`].
pub fn slugify(raw: &str, max_len: usize) -> String {
    let cleaned = separator_re().replace_all(raw, " ");
    let words: Vec<&str> = cleaned.split_whitespace().take(SLUG_WORDS).collect();
    if words.is_empty() {
        return FALLBACK_SLUG.to_string();
    }

    let joined = words.join("-");
    let mut slug = disallowed_re().replace_all(&joined, "").into_owned();
    if slug.is_empty() {
        return FALLBACK_SLUG.to_string();
    }

    // Only ASCII survives the filter, so byte and char lengths agree
    slug.truncate(max_len);
    slug
}

/// Where and how artifact directories are laid out
#[derive(Clone, Debug)]
pub struct ArtifactLayout {
    root: PathBuf,
    slug_max_len: usize,
    write_metadata_file: bool,
}

impl ArtifactLayout {
    /// Layout rooted at [`Config::projects_dir`]
    pub fn new(config: &Config) -> Self {
        Self {
            root: config.projects_dir(),
            slug_max_len: config.artifacts.slug_max_len,
            write_metadata_file: config.artifacts.write_metadata_file,
        }
    }

    /// Directory holding every record's artifact directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `{id:03}_{slug}` for `record`
    pub fn dir_name(&self, record: &Record) -> String {
        format!(
            "{:03}_{}",
            record.id.0,
            slugify(&record.name, self.slug_max_len)
        )
    }

    /// Full path of `record`'s artifact directory
    ///
    /// Deterministic: the same id and name always give the same path.
    pub fn dir_for(&self, record: &Record) -> PathBuf {
        self.root.join(self.dir_name(record))
    }

    /// Create `record`'s artifact directory (and its parents)
    pub async fn prepare(&self, record: &Record) -> Result<PathBuf> {
        let dir = self.dir_for(record);
        tokio::fs::create_dir_all(&dir).await?;
        debug!(record_id = record.id.0, ?dir, "artifact directory ready");
        Ok(dir)
    }

    /// Remove an artifact directory and everything in it
    ///
    /// Failures are logged and swallowed; a leftover directory is harmless
    /// because the next attempt reuses the same path.
    pub async fn cleanup(&self, id: RecordId, dir: &Path) {
        match tokio::fs::remove_dir_all(dir).await {
            Ok(()) => info!(record_id = id.0, ?dir, "artifact directory removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(record_id = id.0, ?dir, "artifact directory already gone");
            }
            Err(e) => warn!(
                record_id = id.0,
                ?dir,
                error = %e,
                "failed to remove artifact directory"
            ),
        }
    }

    /// Write the metadata text file for `record` into `dir`
    ///
    /// Returns the file path, or `None` when metadata files are disabled.
    pub async fn write_metadata(
        &self,
        record: &Record,
        metadata: &ProjectMetadata,
        dir: &Path,
    ) -> Result<Option<PathBuf>> {
        if !self.write_metadata_file {
            return Ok(None);
        }

        let path = dir.join(format!("{}.txt", self.dir_name(record)));
        tokio::fs::write(&path, format_metadata(record, metadata)).await?;
        debug!(record_id = record.id.0, ?path, "metadata file written");
        Ok(Some(path))
    }

    /// Whether `dir` exists and holds at least one entry
    pub async fn is_populated(dir: &Path) -> bool {
        match tokio::fs::read_dir(dir).await {
            Ok(mut entries) => matches!(entries.next_entry().await, Ok(Some(_))),
            Err(_) => false,
        }
    }
}

/// Render the metadata text file
fn format_metadata(record: &Record, metadata: &ProjectMetadata) -> String {
    let field = |value: &Option<String>| value.as_deref().unwrap_or("").to_string();
    let client = &metadata.client;

    let mut lines = vec![
        format!("ID: {}", record.id),
        format!("Key: {}", record.key),
        format!("Name: {}", record.name),
        String::new(),
        "Client:".to_string(),
        format!("  Name:  {}", field(&client.name)),
        format!("  Email: {}", field(&client.email)),
        format!("  Phone: {}", field(&client.phone)),
        format!("Date Due:            {}", field(&metadata.date_due)),
        format!("Project Name:        {}", field(&metadata.project_name)),
        format!("Location:            {}", field(&metadata.location)),
        format!("Project Size:        {}", field(&metadata.project_size)),
        format!("Project Information: {}", field(&metadata.project_information)),
        String::new(),
        format!("Generated: {}", chrono::Utc::now().to_rfc3339()),
    ];
    for line in &mut lines {
        let trimmed = line.trim_end().len();
        line.truncate(trimmed);
    }
    lines.push(String::new());
    lines.join("\n")
}
