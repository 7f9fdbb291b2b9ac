//! Conversion phase: the fail-soft per-file pipeline.
//!
//! Each job copies its source into a private workspace, fixes the
//! extension, normalizes video containers and stamps resolved metadata.
//! Any failing step clears `can_save`; the job then ships the untouched
//! original to the fail bucket instead. A job never aborts the run.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tempfile::TempDir;

use crate::audit::{LogEntry, PipelineLog};
use crate::config::IncompatiblePolicy;
use crate::error::PipelineError;
use crate::tools::TagWrite;
use crate::types::{FileRecord, MediaKind, Outcome, ResolvedDate, TagSet};

use super::context::RunContext;
use super::date::resolve_date;
use super::pool::WorkerPool;
use super::progress::{ConvertPhase, ProgressEvent, ProgressSink};
use super::reconcile::{merge_geo, merge_misc, sanitize, stamp_title};
use super::sidecar::{read_sidecar, SidecarIndex};

/// Success file name prefix.
const NAME_DATE_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// One media file to convert.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub record: FileRecord,
    pub sidecars: Arc<SidecarIndex>,
}

/// Mutable state of a job while its steps run.
struct Attempt<'a> {
    ctx: &'a RunContext,
    record: &'a FileRecord,
    entry: LogEntry,
    can_save: bool,
    primary: TagSet,
    supplementary: TagSet,
    resolved: Option<ResolvedDate>,
    /// Latest working copy and its extension (with dot)
    current: PathBuf,
    ext: String,
}

impl<'a> Attempt<'a> {
    fn new(ctx: &'a RunContext, record: &'a FileRecord) -> Self {
        let ext = record
            .path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        Self {
            ctx,
            record,
            entry: LogEntry::start(record),
            can_save: true,
            primary: TagSet::default(),
            supplementary: TagSet::default(),
            resolved: None,
            current: record.path.clone(),
            ext,
        }
    }

    fn src(&self) -> &Path {
        &self.record.path
    }

    /// Record an error and stop the file from being saved as a success.
    fn fail(&mut self, err: PipelineError) {
        tracing::debug!(path = %self.src().display(), "{}", err);
        self.entry.errors.push(err.to_string());
        self.can_save = false;
    }

    /// Record an error that does not stop the file from succeeding.
    fn note(&mut self, err: PipelineError) {
        tracing::debug!(path = %self.src().display(), "{}", err);
        self.entry.errors.push(err.to_string());
    }

    async fn copy_to(&mut self, dest: PathBuf) -> bool {
        match tokio::fs::copy(&self.current, &dest).await {
            Ok(_) => {
                self.current = dest;
                true
            }
            Err(e) => {
                let err = PipelineError::Copy {
                    from: self.current.clone(),
                    to: dest,
                    message: e.to_string(),
                };
                self.fail(err);
                false
            }
        }
    }

    async fn read_tags(&mut self, sidecars: &SidecarIndex) {
        match self.ctx.tools.read_tags(self.src()).await {
            Ok(tags) => self.primary = tags,
            Err(e) => self.fail(PipelineError::TagRead(e)),
        }

        if let Some(path) = sidecars.find(self.src()) {
            let path = path.to_path_buf();
            match read_sidecar(&path).await {
                Ok(tags) => self.supplementary = sanitize(tags),
                Err(e) => self.note(e),
            }
            self.entry.sidecar_path = Some(path);
        }
    }

    /// Trust the detected file type over the on-disk extension.
    async fn fix_extension(&mut self, workspace: &Path) {
        let Some(detected) = self.primary.misc.get("FileTypeExtension") else {
            return;
        };
        if detected.is_empty() {
            return;
        }
        let detected = format!(".{detected}");
        if detected == self.ext {
            return;
        }
        tracing::debug!(
            path = %self.src().display(),
            from = %self.ext,
            to = %detected,
            "Correcting extension"
        );
        if self.copy_to(workspace.join(format!("2{detected}"))).await {
            self.ext = detected;
        }
    }

    async fn normalize_video(&mut self, workspace: &Path) {
        let needs_reencode = self.record.video.as_ref().is_some_and(|v| v.needs_reencode);
        let policy = self.ctx.config.video.incompatible;

        if needs_reencode && policy == IncompatiblePolicy::Preserve {
            let dest = workspace.join(format!("3{}", self.ext));
            self.copy_to(dest).await;
            return;
        }

        let dest = workspace.join("3.mp4");
        let tools = &self.ctx.tools;
        let result = if needs_reencode {
            tracing::debug!(path = %self.src().display(), "Re-encoding video");
            tools.reencode_mp4(&self.current, &dest).await
        } else {
            tools.repackage_mp4(&self.current, &dest).await
        };
        match result {
            Ok(()) => {
                self.current = dest;
                self.ext = ".mp4".to_string();
            }
            Err(e) => self.fail(PipelineError::VideoNormalize(e)),
        }
    }

    async fn stamp_tags(&mut self, workspace: &Path) {
        let resolved = match resolve_date(&self.record.name, &self.primary, &self.supplementary) {
            Ok(r) => r,
            Err(e) => return self.fail(e),
        };

        let request = TagWrite {
            tags_from: self.src().to_path_buf(),
            working: self.current.clone(),
            output: workspace.join(format!("4{}", self.ext)),
            title: stamp_title(self.src()),
            date: resolved.date,
            misc: merge_misc(&self.primary, &self.supplementary),
            geo: merge_geo(&self.primary, &self.supplementary),
        };
        self.resolved = Some(resolved);

        match self.ctx.tools.write_tags(&request).await {
            Ok(()) => self.current = request.output,
            Err(e) => self.fail(PipelineError::TagWrite(e)),
        }
    }

    /// Every step up to, not including, placement.
    async fn run_steps(&mut self, sidecars: &SidecarIndex) -> Option<TempDir> {
        let workspace = match tempfile::Builder::new()
            .prefix("job-")
            .tempdir_in(&self.ctx.layout.temp)
        {
            Ok(dir) => dir,
            Err(e) => {
                self.fail(PipelineError::Workspace(e));
                return None;
            }
        };
        let ws = workspace.path().to_path_buf();

        self.read_tags(sidecars).await;

        if !self.copy_to(ws.join(format!("1{}", self.ext))).await {
            return Some(workspace);
        }

        self.fix_extension(&ws).await;

        if self.record.kind == MediaKind::Video {
            self.normalize_video(&ws).await;
        }

        if self.can_save {
            self.stamp_tags(&ws).await;
        }

        Some(workspace)
    }

    async fn place_success(&mut self) -> bool {
        let Some(resolved) = &self.resolved else {
            return false;
        };
        let name = format!(
            "{}_{}{}",
            resolved.date.format(NAME_DATE_FORMAT),
            stamp_title(self.src()),
            self.ext
        );
        let dir = self.ctx.layout.success.clone();
        match self.place(&dir, &name, self.current.clone()).await {
            Ok(dest) => {
                self.entry.dest_path = Some(dest);
                true
            }
            Err(e) => {
                self.fail(e);
                false
            }
        }
    }

    async fn place_fail(&mut self) {
        let dir = self.ctx.layout.fail.clone();
        let name = self.record.name.clone();
        match self.place(&dir, &name, self.src().to_path_buf()).await {
            Ok(dest) => self.entry.dest_path = Some(dest),
            Err(e) => self.note(e),
        }
    }

    /// Reserve `dir/name` (or a suffixed variant) and fill it from `from`.
    async fn place(&self, dir: &Path, name: &str, from: PathBuf) -> Result<PathBuf, PipelineError> {
        let placement_err = |message: String| PipelineError::Placement {
            dir: dir.to_path_buf(),
            message,
        };

        let dest = self
            .ctx
            .allocator
            .reserve(dir, name)
            .await
            .map_err(|e| placement_err(e.to_string()))?;

        if let Err(e) = tokio::fs::copy(&from, &dest).await {
            // Leave no empty placeholder behind
            let _ = tokio::fs::remove_file(&dest).await;
            return Err(PipelineError::Copy {
                from,
                to: dest,
                message: e.to_string(),
            });
        }
        Ok(dest)
    }
}

/// Run the full pipeline for one file and describe what happened.
pub async fn convert_file(ctx: &RunContext, job: &ConversionJob) -> LogEntry {
    let clock = Instant::now();
    let mut attempt = Attempt::new(ctx, &job.record);

    let workspace = attempt.run_steps(&job.sidecars).await;

    let placed = attempt.can_save && attempt.place_success().await;
    if !placed {
        attempt.place_fail().await;
    }

    if let Some(workspace) = workspace {
        if let Err(e) = workspace.close() {
            tracing::warn!("Failed to remove job workspace: {}", e);
        }
    }

    let Attempt {
        mut entry,
        primary,
        supplementary,
        resolved,
        ..
    } = attempt;

    entry.outcome = if placed { Outcome::Success } else { Outcome::Fail };
    entry.primary_tags = primary.flatten();
    entry.supplementary_tags = supplementary.flatten();
    if let Some(resolved) = resolved {
        entry.date_source = Some(resolved.source);
        entry.date_source_detail = Some(resolved.detail);
        entry.resolved_date = Some(resolved.date);
    }
    entry.ended_at = Utc::now();
    entry.elapsed_sec = clock.elapsed().as_secs_f64();

    match entry.outcome {
        Outcome::Success => tracing::debug!(
            src = %entry.src_path.display(),
            dest = ?entry.dest_path,
            "Converted"
        ),
        Outcome::Fail => tracing::warn!(
            src = %entry.src_path.display(),
            errors = ?entry.errors,
            "Conversion failed"
        ),
    }
    entry
}

/// Success and failure counts of a conversion sub-phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseCounts {
    pub succeeded: usize,
    pub failed: usize,
}

/// Convert `records` with the configured worker count, appending every
/// result to `log` as it arrives.
pub async fn convert_all(
    ctx: Arc<RunContext>,
    records: Vec<FileRecord>,
    sidecars: Arc<SidecarIndex>,
    phase: ConvertPhase,
    log: &mut PipelineLog,
    progress: &dyn ProgressSink,
) -> PhaseCounts {
    let total = records.len();
    let workers = ctx.config.pipeline.conversion_workers;
    tracing::info!(%phase, files = total, workers, "Converting");

    let jobs: Vec<ConversionJob> = records
        .into_iter()
        .map(|record| ConversionJob {
            record,
            sidecars: Arc::clone(&sidecars),
        })
        .collect();

    let mut pool = WorkerPool::spawn(jobs, workers, move |job: ConversionJob| {
        let ctx = Arc::clone(&ctx);
        async move { convert_file(&ctx, &job).await }
    });

    let mut counts = PhaseCounts::default();
    let mut done = 0;
    while let Some(entry) = pool.next().await {
        done += 1;
        match entry.outcome {
            Outcome::Success => counts.succeeded += 1,
            Outcome::Fail => counts.failed += 1,
        }
        let current = entry.src_path.clone();
        if let Err(e) = log.append(entry) {
            tracing::error!(path = %log.path().display(), "Failed to write log: {}", e);
        }
        progress.update(ProgressEvent::Converting {
            phase,
            done,
            total,
            succeeded: counts.succeeded,
            failed: counts.failed,
            current,
        });
    }

    tracing::info!(
        %phase,
        succeeded = counts.succeeded,
        failed = counts.failed,
        "Phase complete"
    );
    counts
}
