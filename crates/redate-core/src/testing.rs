//! Test doubles for the external tool boundary.
//!
//! [`MockTools`] answers [`MediaTools`] calls from scripted per-path
//! responses and performs file operations with plain copies, so the whole
//! pipeline can run without exiftool or ffmpeg installed.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{ToolError, ToolResult};
use crate::tools::{MediaTools, TagWrite, VideoProbe};
use crate::types::TagSet;

/// Appended to "re-encoded" output so it differs from its input.
pub const REENCODE_MARKER: &[u8] = b"\0mock-reencoded";

/// A recorded tool invocation for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    MimeType(PathBuf),
    ProbeVideo(PathBuf),
    ReadTags(PathBuf),
    WriteTags(TagWrite),
    Repackage(PathBuf),
    Reencode(PathBuf),
}

#[derive(Debug, Default)]
struct MockState {
    mime: HashMap<PathBuf, String>,
    probes: HashMap<PathBuf, VideoProbe>,
    tags: HashMap<PathBuf, TagSet>,
    failing_mime: HashSet<PathBuf>,
    failing_tags: HashSet<PathBuf>,
    failing_writes: HashSet<PathBuf>,
    fail_video: bool,
    unavailable: bool,
    calls: Vec<MockCall>,
}

/// Scripted implementation of [`MediaTools`].
///
/// Unscripted paths get an empty MIME type, an empty tag set and a silent
/// zero-length H.264 probe.
#[derive(Debug, Clone, Default)]
pub struct MockTools {
    state: Arc<Mutex<MockState>>,
}

fn failure(tool: &str, path: &Path) -> ToolError {
    ToolError::Failed {
        tool: tool.to_string(),
        status: "exit status: 1".to_string(),
        output: format!("mock failure for {}", path.display()),
    }
}

impl MockTools {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_mime(&self, path: impl Into<PathBuf>, mime: &str) {
        self.state().mime.insert(path.into(), mime.to_string());
    }

    pub fn set_probe(&self, path: impl Into<PathBuf>, probe: VideoProbe) {
        self.state().probes.insert(path.into(), probe);
    }

    pub fn set_tags(&self, path: impl Into<PathBuf>, tags: TagSet) {
        self.state().tags.insert(path.into(), tags);
    }

    pub fn fail_mime(&self, path: impl Into<PathBuf>) {
        self.state().failing_mime.insert(path.into());
    }

    pub fn fail_tags(&self, path: impl Into<PathBuf>) {
        self.state().failing_tags.insert(path.into());
    }

    /// Fail tag writes whose `tags_from` is `path`.
    pub fn fail_write(&self, path: impl Into<PathBuf>) {
        self.state().failing_writes.insert(path.into());
    }

    /// Fail every repackage and re-encode.
    pub fn fail_video(&self) {
        self.state().fail_video = true;
    }

    /// Make [`MediaTools::validate`] fail.
    pub fn set_unavailable(&self) {
        self.state().unavailable = true;
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.clone()
    }

    pub fn calls_matching(&self, pred: impl Fn(&MockCall) -> bool) -> Vec<MockCall> {
        self.state().calls.iter().filter(|c| pred(c)).cloned().collect()
    }

    fn record(&self, call: MockCall) {
        self.state().calls.push(call);
    }
}

async fn copy(tool: &str, from: &Path, to: &Path) -> ToolResult<()> {
    tokio::fs::copy(from, to)
        .await
        .map(|_| ())
        .map_err(|e| ToolError::Failed {
            tool: tool.to_string(),
            status: "exit status: 1".to_string(),
            output: e.to_string(),
        })
}

#[async_trait]
impl MediaTools for MockTools {
    async fn validate(&self) -> ToolResult<()> {
        if self.state().unavailable {
            return Err(ToolError::Spawn {
                tool: "exiftool".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not installed"),
            });
        }
        Ok(())
    }

    async fn mime_type(&self, path: &Path) -> ToolResult<String> {
        self.record(MockCall::MimeType(path.to_path_buf()));
        let state = self.state();
        if state.failing_mime.contains(path) {
            return Err(failure("exiftool", path));
        }
        Ok(state.mime.get(path).cloned().unwrap_or_default())
    }

    async fn probe_video(&self, path: &Path) -> ToolResult<VideoProbe> {
        self.record(MockCall::ProbeVideo(path.to_path_buf()));
        Ok(self
            .state()
            .probes
            .get(path)
            .cloned()
            .unwrap_or_else(|| VideoProbe {
                video_codec: Some("h264".to_string()),
                audio_codec: None,
                duration_secs: 0.0,
            }))
    }

    async fn read_tags(&self, path: &Path) -> ToolResult<TagSet> {
        self.record(MockCall::ReadTags(path.to_path_buf()));
        let state = self.state();
        if state.failing_tags.contains(path) {
            return Err(failure("exiftool", path));
        }
        Ok(state.tags.get(path).cloned().unwrap_or_default())
    }

    async fn write_tags(&self, request: &TagWrite) -> ToolResult<()> {
        self.record(MockCall::WriteTags(request.clone()));
        if self.state().failing_writes.contains(&request.tags_from) {
            return Err(failure("exiftool", &request.tags_from));
        }
        copy("exiftool", &request.working, &request.output).await
    }

    async fn repackage_mp4(&self, input: &Path, output: &Path) -> ToolResult<()> {
        self.record(MockCall::Repackage(input.to_path_buf()));
        if self.state().fail_video {
            return Err(failure("ffmpeg", input));
        }
        copy("ffmpeg", input, output).await
    }

    async fn reencode_mp4(&self, input: &Path, output: &Path) -> ToolResult<()> {
        self.record(MockCall::Reencode(input.to_path_buf()));
        if self.state().fail_video {
            return Err(failure("ffmpeg", input));
        }
        let io_failure = |e: std::io::Error| ToolError::Failed {
            tool: "ffmpeg".to_string(),
            status: "exit status: 1".to_string(),
            output: e.to_string(),
        };
        let mut bytes = tokio::fs::read(input).await.map_err(io_failure)?;
        bytes.extend_from_slice(REENCODE_MARKER);
        tokio::fs::write(output, bytes).await.map_err(io_failure)
    }
}
