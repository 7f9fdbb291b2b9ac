//! The `log.json` audit trail.
//!
//! One [`LogEntry`] per media file, appended as conversion results arrive.
//! After every append the whole array is rewritten to a sibling temp file
//! and renamed over the log, so the file on disk is always a complete JSON
//! document.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::types::{DateSource, FileRecord, MediaKind, Outcome, VideoFacts};

/// Everything decided about one media file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub src_path: PathBuf,

    /// Where the file landed; absent when even the fail copy could not be made
    pub dest_path: Option<PathBuf>,

    pub sidecar_path: Option<PathBuf>,
    pub outcome: Outcome,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub elapsed_sec: f64,
    pub media_kind: MediaKind,
    pub date_source: Option<DateSource>,
    pub date_source_detail: Option<String>,
    pub resolved_date: Option<NaiveDateTime>,
    pub primary_tags: BTreeMap<String, String>,
    pub supplementary_tags: BTreeMap<String, String>,
    pub video_facts: Option<VideoFacts>,

    /// Non-fatal errors in the order they happened
    pub errors: Vec<String>,
}

impl LogEntry {
    /// A fresh entry for `record`, marked failed until proven otherwise.
    pub fn start(record: &FileRecord) -> Self {
        let now = Utc::now();
        Self {
            src_path: record.path.clone(),
            dest_path: None,
            sidecar_path: None,
            outcome: Outcome::Fail,
            started_at: now,
            ended_at: now,
            elapsed_sec: 0.0,
            media_kind: record.kind,
            date_source: None,
            date_source_detail: None,
            resolved_date: None,
            primary_tags: BTreeMap::new(),
            supplementary_tags: BTreeMap::new(),
            video_facts: record.video.clone(),
            errors: Vec::new(),
        }
    }
}

/// Append-only audit log persisted as a pretty-printed JSON array.
#[derive(Debug)]
pub struct PipelineLog {
    path: PathBuf,
    temp_path: PathBuf,
    entries: Vec<LogEntry>,
}

impl PipelineLog {
    /// Create the log at `path`, writing an empty array immediately.
    pub fn create(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "log.json".to_string());
        let temp_path = path.with_file_name(format!(".{file_name}.tmp"));

        let log = Self {
            path,
            temp_path,
            entries: Vec::new(),
        };
        log.save()?;
        Ok(log)
    }

    pub fn append(&mut self, entry: LogEntry) -> io::Result<()> {
        self.entries.push(entry);
        self.save()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a log written by a previous run.
    pub fn load(path: &Path) -> io::Result<Vec<LogEntry>> {
        let bytes = fs::read(path)?;
        serde_json::from_slice(&bytes).map_err(io::Error::other)
    }

    fn save(&self) -> io::Result<()> {
        // Write to temp file first, then rename for atomicity
        let file = File::create(&self.temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.entries).map_err(io::Error::other)?;
        writeln!(writer)?;
        writer.flush()?;
        fs::rename(&self.temp_path, &self.path)
    }
}
