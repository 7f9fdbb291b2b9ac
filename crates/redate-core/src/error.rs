//! Error types for the redate export pipeline.
//!
//! Two classes of failure exist. Setup errors abort a run before any file is
//! touched. Per-file pipeline errors never abort anything: they are rendered
//! into the file's log entry and the file is routed to the fail bucket.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for redate operations.
#[derive(Error, Debug)]
pub enum RedateError {
    /// Run setup failed; nothing was analyzed or converted
    #[error("Setup error: {0}")]
    Setup(#[from] SetupError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fatal errors raised while preparing a run.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Source directory {path} is not readable: {message}")]
    SourceUnreadable { path: PathBuf, message: String },

    #[error("Destination {0} already exists")]
    DestinationExists(PathBuf),

    #[error("Failed to create destination directory {path}: {message}")]
    DestinationUncreatable { path: PathBuf, message: String },

    #[error("Required tool unavailable: {0}")]
    ToolUnavailable(#[from] ToolError),

    #[error("Failed to count files under {path}: {message}")]
    CountFailed { path: PathBuf, message: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors from invoking an external tool (exiftool, ffprobe, ffmpeg).
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}: {output}")]
    Failed {
        tool: String,
        status: String,
        output: String,
    },

    #[error("Unexpected {tool} output: {message}")]
    Parse { tool: String, message: String },
}

/// Per-file conversion errors. Recorded, never propagated past the job.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to create working directory: {0}")]
    Workspace(std::io::Error),

    #[error("Failed to copy {from} to {to}: {message}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        message: String,
    },

    #[error("Error getting all exif tags: {0}")]
    TagRead(ToolError),

    #[error("Error reading supplementary file {path}: {message}")]
    Sidecar { path: PathBuf, message: String },

    #[error("No earliest date found in file, supplementary file, or filename")]
    DateResolution,

    #[error("Error copying or encoding video: {0}")]
    VideoNormalize(ToolError),

    #[error("Error setting exif tags: {0}")]
    TagWrite(ToolError),

    #[error("Failed to reserve a destination name in {dir}: {message}")]
    Placement { dir: PathBuf, message: String },
}

/// Convenience type alias for redate results.
pub type Result<T> = std::result::Result<T, RedateError>;

/// Convenience type alias for external tool results.
pub type ToolResult<T> = std::result::Result<T, ToolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_error_wraps_into_top_level() {
        let err: RedateError = SetupError::DestinationExists(PathBuf::from("/tmp/out")).into();
        assert_eq!(
            err.to_string(),
            "Setup error: Destination /tmp/out already exists"
        );
    }

    #[test]
    fn tool_failure_message_includes_output() {
        let err = ToolError::Failed {
            tool: "exiftool".to_string(),
            status: "exit status: 1".to_string(),
            output: "File not found".to_string(),
        };
        let wrapped = PipelineError::TagWrite(err);
        assert!(wrapped.to_string().contains("File not found"));
        assert!(wrapped.to_string().starts_with("Error setting exif tags"));
    }
}
