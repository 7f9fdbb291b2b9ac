//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};

/// Worker pool sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Workers classifying discovered files
    pub analysis_workers: usize,

    /// Workers converting media files
    pub conversion_workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            analysis_workers: 10,
            conversion_workers: 10,
        }
    }
}

/// Locations of the external tools. `~` is expanded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub exiftool: String,
    pub ffprobe: String,
    pub ffmpeg: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            exiftool: "exiftool".to_string(),
            ffprobe: "ffprobe".to_string(),
            ffmpeg: "ffmpeg".to_string(),
        }
    }
}

/// What to do with a video whose codecs cannot be stream-copied into MP4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncompatiblePolicy {
    /// Keep the original encoding and container untouched
    #[default]
    Preserve,
    /// Transcode to H.264/AAC in an MP4 container
    Reencode,
}

/// Video normalization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Video codecs that can be repackaged into MP4 as-is
    pub compatible_video_codecs: Vec<String>,

    /// Audio codecs that can be repackaged into MP4 as-is
    pub compatible_audio_codecs: Vec<String>,

    /// Handling of videos outside the allow-lists
    pub incompatible: IncompatiblePolicy,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            // mpeg1video is left out: QuickTime fails to open the repackaged result.
            compatible_video_codecs: ["mpeg2video", "mpeg4", "h264"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            compatible_audio_codecs: [
                "h264", "aac", "mp1", "mp2", "mp3", "qcelp", "twinvq", "vorbis", "alac",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            incompatible: IncompatiblePolicy::Preserve,
        }
    }
}

/// Destination tree layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Subdirectory for successfully dated files
    pub success_dir: String,

    /// Subdirectory for untouched originals that could not be converted
    pub fail_dir: String,

    /// Scratch subdirectory, removed at the end of a run
    pub temp_dir: String,

    /// Audit log file name
    pub log_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            success_dir: "success".to_string(),
            fail_dir: "fail".to_string(),
            temp_dir: ".tmp".to_string(),
            log_file: "log.json".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: pretty or json
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
