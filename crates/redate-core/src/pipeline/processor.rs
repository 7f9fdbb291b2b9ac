//! Pipeline orchestration - wires discovery, analysis and conversion into
//! one export run.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::audit::PipelineLog;
use crate::config::Config;
use crate::error::{Result, SetupError};
use crate::tools::{MediaTools, SystemTools};
use crate::types::RunSummary;

use super::analyze::analyze;
use super::context::RunContext;
use super::convert::convert_all;
use super::discovery::{absolutize, discover, quick_count};
use super::progress::{ConvertPhase, ProgressEvent, ProgressSink};
use super::sidecar::SidecarIndex;

/// Sibling `<src>_Export` directory used when no destination is given.
pub fn default_destination(src: &Path) -> PathBuf {
    let src = absolutize(src);
    let name = src
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "media".to_string());
    src.with_file_name(format!("{name}_Export"))
}

/// Removes the scratch directory however the run ends.
struct TempGuard(PathBuf);

impl Drop for TempGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.0) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.0.display(), "Failed to remove temp directory: {}", e);
            }
        }
    }
}

/// Runs complete exports with one configuration and tool set.
pub struct Exporter {
    config: Config,
    tools: Arc<dyn MediaTools>,
}

impl Exporter {
    pub fn new(config: Config, tools: Arc<dyn MediaTools>) -> Self {
        Self { config, tools }
    }

    /// Exporter backed by the installed exiftool, ffprobe and ffmpeg.
    pub fn with_system_tools(config: Config) -> Self {
        let tools = Arc::new(SystemTools::from_config(&config));
        Self::new(config, tools)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Export every file under `src` into the new directory `dest`.
    ///
    /// Fails only during setup; per-file problems end up in the log.
    pub async fn run(
        &self,
        src: &Path,
        dest: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<RunSummary> {
        let start = Instant::now();
        let src = absolutize(src);
        let dest = absolutize(dest);

        let meta = std::fs::metadata(&src).map_err(|e| SetupError::SourceUnreadable {
            path: src.clone(),
            message: e.to_string(),
        })?;
        if !meta.is_dir() {
            return Err(SetupError::SourceUnreadable {
                path: src,
                message: "not a directory".to_string(),
            }
            .into());
        }
        if dest.exists() {
            return Err(SetupError::DestinationExists(dest).into());
        }
        self.tools.validate().await.map_err(SetupError::from)?;

        // Walk the source before the destination exists, so a failed walk
        // leaves nothing behind and a nested destination is never discovered
        progress.update(ProgressEvent::Counting);
        let approx = quick_count(&src)?;
        progress.update(ProgressEvent::Counted { files: approx });
        let paths = discover(&src)?;
        let discovered = paths.len();

        let ctx = Arc::new(RunContext::new(
            self.config.clone(),
            Arc::clone(&self.tools),
            &dest,
        ));
        ctx.layout
            .create()
            .map_err(|e| SetupError::DestinationUncreatable {
                path: dest.clone(),
                message: e.to_string(),
            })?;
        let _temp_guard = TempGuard(ctx.layout.temp.clone());
        tracing::info!(
            src = %src.display(),
            dest = %dest.display(),
            files = discovered,
            "Starting export"
        );

        let tree = analyze(
            paths,
            Arc::clone(&ctx.tools),
            ctx.config.video.clone(),
            ctx.config.pipeline.analysis_workers,
            progress,
        )
        .await;
        progress.update(ProgressEvent::Analyzed(tree.summary.clone()));

        let mut log = PipelineLog::create(&ctx.layout.log)?;
        let sidecars = Arc::new(SidecarIndex::new(tree.supplementary.keys().cloned()));

        let images = convert_all(
            Arc::clone(&ctx),
            tree.images.values().cloned().collect(),
            Arc::clone(&sidecars),
            ConvertPhase::Images,
            &mut log,
            progress,
        )
        .await;
        let videos = convert_all(
            Arc::clone(&ctx),
            tree.videos.values().cloned().collect(),
            sidecars,
            ConvertPhase::Videos,
            &mut log,
            progress,
        )
        .await;

        let summary = RunSummary {
            discovered,
            images: tree.images.len(),
            videos: tree.videos.len(),
            supplementary: tree.supplementary.len(),
            unknown: tree.unknown.len(),
            succeeded: images.succeeded + videos.succeeded,
            failed: images.failed + videos.failed,
            log_path: log.path().to_path_buf(),
            elapsed_secs: start.elapsed().as_secs_f64(),
        };
        tracing::info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            elapsed_secs = summary.elapsed_secs,
            "Export complete"
        );
        progress.update(ProgressEvent::Complete(summary.clone()));
        Ok(summary)
    }
}
