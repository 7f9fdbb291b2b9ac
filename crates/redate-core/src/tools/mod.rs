//! Boundary to the external media tools.
//!
//! Everything the pipeline learns from or does to a media file goes through
//! [`MediaTools`]. [`SystemTools`] shells out to exiftool, ffprobe and ffmpeg;
//! tests substitute [`crate::testing::MockTools`].

pub mod exiftool;
pub mod ffmpeg;

pub use exiftool::ExifTool;
pub use ffmpeg::Ffmpeg;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::config::Config;
use crate::error::{ToolError, ToolResult};
use crate::types::{StrTag, TagSet};

/// Stream facts reported by a video probe.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoProbe {
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub duration_secs: f64,
}

/// A metadata write: copy every tag from `tags_from` onto a copy of
/// `working` saved at `output`, overriding title, dates, misc and geo.
#[derive(Debug, Clone, PartialEq)]
pub struct TagWrite {
    pub tags_from: PathBuf,
    pub working: PathBuf,
    pub output: PathBuf,
    pub title: String,
    pub date: NaiveDateTime,
    /// Written in order; a later duplicate name wins
    pub misc: Vec<StrTag>,
    pub geo: Vec<StrTag>,
}

/// Operations the pipeline needs from the external tools.
#[async_trait]
pub trait MediaTools: Send + Sync {
    /// Check that every tool can be started.
    async fn validate(&self) -> ToolResult<()>;

    /// MIME type of a file, empty when the tool cannot tell.
    async fn mime_type(&self, path: &Path) -> ToolResult<String>;

    /// Codec names and duration of a video.
    async fn probe_video(&self, path: &Path) -> ToolResult<VideoProbe>;

    /// Misc, date and geo tags embedded in a file.
    async fn read_tags(&self, path: &Path) -> ToolResult<TagSet>;

    async fn write_tags(&self, request: &TagWrite) -> ToolResult<()>;

    /// Repackage into an MP4 container without touching the streams.
    async fn repackage_mp4(&self, input: &Path, output: &Path) -> ToolResult<()>;

    /// Transcode into H.264/AAC in an MP4 container.
    async fn reencode_mp4(&self, input: &Path, output: &Path) -> ToolResult<()>;
}

/// [`MediaTools`] backed by the installed command-line tools.
#[derive(Debug, Clone)]
pub struct SystemTools {
    exiftool: ExifTool,
    ffmpeg: Ffmpeg,
}

impl SystemTools {
    pub fn new(exiftool: ExifTool, ffmpeg: Ffmpeg) -> Self {
        Self { exiftool, ffmpeg }
    }

    /// Build from the `[tools]` config section.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            ExifTool::new(Config::tool_path(&config.tools.exiftool)),
            Ffmpeg::new(
                Config::tool_path(&config.tools.ffmpeg),
                Config::tool_path(&config.tools.ffprobe),
            ),
        )
    }
}

#[async_trait]
impl MediaTools for SystemTools {
    async fn validate(&self) -> ToolResult<()> {
        self.exiftool.validate().await?;
        self.ffmpeg.validate().await
    }

    async fn mime_type(&self, path: &Path) -> ToolResult<String> {
        self.exiftool.mime_type(path).await
    }

    async fn probe_video(&self, path: &Path) -> ToolResult<VideoProbe> {
        self.ffmpeg.probe(path).await
    }

    async fn read_tags(&self, path: &Path) -> ToolResult<TagSet> {
        self.exiftool.read_tags(path).await
    }

    async fn write_tags(&self, request: &TagWrite) -> ToolResult<()> {
        self.exiftool.write_tags(request).await
    }

    async fn repackage_mp4(&self, input: &Path, output: &Path) -> ToolResult<()> {
        self.ffmpeg.repackage_mp4(input, output).await
    }

    async fn reencode_mp4(&self, input: &Path, output: &Path) -> ToolResult<()> {
        self.ffmpeg.reencode_mp4(input, output).await
    }
}

/// Run a tool to completion and return its stdout.
///
/// A non-zero exit becomes [`ToolError::Failed`] carrying the combined output.
pub(crate) async fn run_tool<I, S>(tool: &str, program: &Path, args: I) -> ToolResult<Vec<u8>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| ToolError::Spawn {
            tool: tool.to_string(),
            source,
        })?;

    if !output.status.success() {
        let mut combined = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            if !combined.is_empty() {
                combined.push('\n');
            }
            combined.push_str(stdout.trim());
        }
        return Err(ToolError::Failed {
            tool: tool.to_string(),
            status: output.status.to_string(),
            output: combined,
        });
    }

    Ok(output.stdout)
}
