//! The default `redate <SRC> [DEST]` command.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use redate_core::{
    default_destination, AnalysisSummary, Config, Exporter, ProgressEvent, ProgressSink,
    RunSummary,
};

/// Exit status after Ctrl-C, as shells report SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Arguments for an export run.
#[derive(Args, Debug, Default)]
pub struct ExportArgs {
    /// Directory of exported photos and videos
    pub src: Option<PathBuf>,

    /// New directory to export into (defaults to <SRC>_Export)
    pub dest: Option<PathBuf>,

    /// Worker count for both the analysis and conversion phases
    #[arg(long)]
    pub workers: Option<NonZeroUsize>,

    /// Re-encode videos whose codecs cannot be copied into MP4
    #[arg(long)]
    pub reencode: bool,
}

/// Renders pipeline progress on a single terminal bar.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] {prefix:>10} [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
        );
        Self { bar }
    }
}

impl ProgressSink for BarProgress {
    fn update(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Counting => {
                self.bar.set_prefix("counting");
                self.bar.set_message("scanning source tree...");
            }
            ProgressEvent::Counted { files } => {
                self.bar.set_prefix("analyzing");
                self.bar.set_length(files as u64);
                self.bar.set_position(0);
                self.bar.set_message("");
            }
            ProgressEvent::Analyzing { done, total } => {
                self.bar.set_length(total as u64);
                self.bar.set_position(done as u64);
            }
            ProgressEvent::Analyzed(summary) => {
                self.bar.println(describe_analysis(&summary));
            }
            ProgressEvent::Converting {
                phase,
                done,
                total,
                succeeded,
                failed,
                ..
            } => {
                self.bar.set_prefix(phase.to_string());
                self.bar.set_length(total as u64);
                self.bar.set_position(done as u64);
                self.bar
                    .set_message(format!("{succeeded} exported, {failed} failed"));
            }
            ProgressEvent::Complete(_) => self.bar.finish_and_clear(),
        }
    }
}

fn describe_analysis(summary: &AnalysisSummary) -> String {
    let list = |counts: &std::collections::BTreeMap<String, usize>| {
        if counts.is_empty() {
            return "none".to_string();
        }
        counts
            .iter()
            .map(|(ext, n)| format!("{n} {ext}"))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut text = format!(
        "  Images: {}\n  Videos: {} ({:.0}s total)",
        list(&summary.image_extensions),
        list(&summary.video_extensions),
        summary.total_video_secs,
    );
    if summary.needs_reencode > 0 {
        text.push_str(&format!(
            "\n  {} video(s) use codecs MP4 cannot carry",
            summary.needs_reencode
        ));
    }
    if summary.probe_failures > 0 {
        text.push_str(&format!(
            "\n  {} file(s) could not be identified",
            summary.probe_failures
        ));
    }
    text
}

/// Execute an export run.
pub async fn execute(args: ExportArgs, config: Config, json_summary: bool) -> anyhow::Result<()> {
    let Some(src) = args.src else {
        anyhow::bail!("No source directory given");
    };
    let dest = args.dest.unwrap_or_else(|| default_destination(&src));

    let exporter = Exporter::with_system_tools(config);
    let progress = BarProgress::new();

    let summary = tokio::select! {
        result = exporter.run(&src, &dest, &progress) => result?,
        _ = tokio::signal::ctrl_c() => {
            progress.bar.abandon_with_message("interrupted");
            let _ = console::Term::stderr().show_cursor();
            eprintln!("Interrupted; {} is incomplete.", dest.display());
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    };

    if json_summary {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

/// Print a formatted summary table after an export.
fn print_summary(summary: &RunSummary) {
    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Exported:     {:>8}", summary.succeeded);
    if summary.failed > 0 {
        eprintln!("    Failed:       {:>8}", summary.failed);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Images:       {:>8}", summary.images);
    eprintln!("    Videos:       {:>8}", summary.videos);
    eprintln!("    Sidecars:     {:>8}", summary.supplementary);
    if summary.unknown > 0 {
        eprintln!("    Skipped:      {:>8}", summary.unknown);
    }
    eprintln!("    Duration:     {:>7.1}s", summary.elapsed_secs);
    eprintln!("  ====================================");
    eprintln!("  Log: {}", summary.log_path.display());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_analysis() {
        let mut summary = AnalysisSummary::default();
        summary.image_extensions.insert("jpg".into(), 12);
        summary.image_extensions.insert("png".into(), 2);
        summary.needs_reencode = 1;

        let text = describe_analysis(&summary);
        assert!(text.contains("Images: 12 jpg, 2 png"));
        assert!(text.contains("Videos: none"));
        assert!(text.contains("1 video(s)"));
        assert!(!text.contains("identified"));
    }

    #[test]
    fn test_progress_events_do_not_panic() {
        let progress = BarProgress::new();
        progress.update(ProgressEvent::Counting);
        progress.update(ProgressEvent::Counted { files: 3 });
        progress.update(ProgressEvent::Analyzing { done: 3, total: 3 });
        progress.update(ProgressEvent::Complete(RunSummary::default()));
        assert!(progress.bar.is_finished());
    }

    #[tokio::test]
    async fn test_missing_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = ExportArgs {
            src: Some(dir.path().join("missing")),
            dest: Some(dir.path().join("out")),
            ..Default::default()
        };
        assert!(execute(args, Config::default(), false).await.is_err());
    }
}
