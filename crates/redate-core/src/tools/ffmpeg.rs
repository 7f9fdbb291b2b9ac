//! ffprobe stream inspection and ffmpeg MP4 normalization.

use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::{run_tool, VideoProbe};
use crate::error::{ToolError, ToolResult};

/// ffmpeg and ffprobe executables.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Ffmpeg {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    pub async fn validate(&self) -> ToolResult<()> {
        run_tool("ffmpeg", &self.ffmpeg, ["-version"]).await?;
        run_tool("ffprobe", &self.ffprobe, ["-version"]).await?;
        Ok(())
    }

    pub async fn probe(&self, path: &Path) -> ToolResult<VideoProbe> {
        let mut args: Vec<OsString> = [
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ]
        .iter()
        .map(OsString::from)
        .collect();
        args.push(path.into());

        let out = run_tool("ffprobe", &self.ffprobe, args).await?;
        parse_probe_output(&String::from_utf8_lossy(&out))
    }

    pub async fn repackage_mp4(&self, input: &Path, output: &Path) -> ToolResult<()> {
        run_tool(
            "ffmpeg",
            &self.ffmpeg,
            transcode_args(input, output, &["-c:v", "copy", "-c:a", "copy"]),
        )
        .await?;
        Ok(())
    }

    pub async fn reencode_mp4(&self, input: &Path, output: &Path) -> ToolResult<()> {
        run_tool(
            "ffmpeg",
            &self.ffmpeg,
            transcode_args(
                input,
                output,
                &[
                    "-c:v", "libx264", "-pix_fmt", "yuv420p", "-c:a", "aac", "-b:a", "128k",
                    "-preset", "slow", "-crf", "17",
                ],
            ),
        )
        .await?;
        Ok(())
    }
}

fn transcode_args(input: &Path, output: &Path, codec_args: &[&str]) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-y".into(), "-i".into(), input.into()];
    args.push("-f".into());
    args.push("mp4".into());
    args.extend(codec_args.iter().map(OsString::from));
    args.push(output.into());
    args
}

/// Parse ffprobe JSON into the first video and audio codec plus duration.
fn parse_probe_output(output: &str) -> ToolResult<VideoProbe> {
    #[derive(Deserialize)]
    struct ProbeOutput {
        #[serde(default)]
        format: Option<ProbeFormat>,
        #[serde(default)]
        streams: Vec<ProbeStream>,
    }

    #[derive(Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }

    #[derive(Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        codec_name: Option<String>,
    }

    let probe: ProbeOutput = serde_json::from_str(output).map_err(|e| ToolError::Parse {
        tool: "ffprobe".to_string(),
        message: format!("Failed to parse ffprobe output: {}", e),
    })?;

    let codec_of = |kind: &str| {
        probe
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some(kind))
            .and_then(|s| s.codec_name.clone())
    };

    let duration_secs = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(VideoProbe {
        video_codec: codec_of("video"),
        audio_codec: codec_of("audio"),
        duration_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_output_video() {
        let output = r#"{
            "streams": [
                {"index": 0, "codec_type": "video", "codec_name": "hevc"},
                {"index": 1, "codec_type": "audio", "codec_name": "aac"},
                {"index": 2, "codec_type": "data"}
            ],
            "format": {"filename": "/a.mov", "format_name": "mov,mp4,m4a", "duration": "7.340000"}
        }"#;

        let probe = parse_probe_output(output).unwrap();
        assert_eq!(probe.video_codec.as_deref(), Some("hevc"));
        assert_eq!(probe.audio_codec.as_deref(), Some("aac"));
        assert!((probe.duration_secs - 7.34).abs() < 1e-9);
    }

    #[test]
    fn test_parse_probe_output_silent_clip() {
        let output = r#"{"streams":[{"codec_type":"video","codec_name":"h264"}],"format":{}}"#;
        let probe = parse_probe_output(output).unwrap();
        assert_eq!(probe.audio_codec, None);
        assert_eq!(probe.duration_secs, 0.0);
    }

    #[test]
    fn test_parse_probe_output_invalid() {
        assert!(parse_probe_output("not json").is_err());
    }

    #[test]
    fn test_transcode_args_copy() {
        let args: Vec<String> = transcode_args(
            Path::new("/w/2.mov"),
            Path::new("/w/3.mp4"),
            &["-c:v", "copy", "-c:a", "copy"],
        )
        .into_iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
        assert_eq!(
            args.join(" "),
            "-y -i /w/2.mov -f mp4 -c:v copy -c:a copy /w/3.mp4"
        );
    }
}
