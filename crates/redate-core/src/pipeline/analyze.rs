//! Analysis phase: classify every discovered file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::VideoConfig;
use crate::error::ToolError;
use crate::tools::MediaTools;
use crate::types::{AnalysisSummary, FileRecord, MediaKind, VideoFacts};

use super::pool::WorkerPool;
use super::progress::{ProgressEvent, ProgressSink};

/// Classified source tree.
#[derive(Debug, Clone, Default)]
pub struct AnalyzedTree {
    pub images: BTreeMap<PathBuf, FileRecord>,
    pub videos: BTreeMap<PathBuf, FileRecord>,
    pub supplementary: BTreeMap<PathBuf, FileRecord>,
    pub unknown: Vec<FileRecord>,
    pub summary: AnalysisSummary,
}

impl AnalyzedTree {
    pub fn media_count(&self) -> usize {
        self.images.len() + self.videos.len()
    }

    pub fn total(&self) -> usize {
        self.media_count() + self.supplementary.len() + self.unknown.len()
    }

    fn insert(&mut self, record: FileRecord) {
        match record.kind {
            MediaKind::Image => {
                *self
                    .summary
                    .image_extensions
                    .entry(record.extension())
                    .or_default() += 1;
                self.images.insert(record.path.clone(), record);
            }
            MediaKind::Video => {
                *self
                    .summary
                    .video_extensions
                    .entry(record.extension())
                    .or_default() += 1;
                if let Some(facts) = &record.video {
                    self.summary.total_video_secs += facts.duration_secs;
                    if facts.needs_reencode {
                        self.summary.needs_reencode += 1;
                    }
                }
                self.videos.insert(record.path.clone(), record);
            }
            MediaKind::Supplementary => {
                self.supplementary.insert(record.path.clone(), record);
            }
            MediaKind::Unknown => self.unknown.push(record),
        }
    }
}

/// Outcome of classifying one file. A probe error leaves the file unknown.
#[derive(Debug)]
pub struct Classified {
    pub record: FileRecord,
    pub error: Option<ToolError>,
}

fn kind_for(path: &Path, mime_type: &str) -> MediaKind {
    if mime_type.starts_with("image") {
        MediaKind::Image
    } else if mime_type.starts_with("video") {
        MediaKind::Video
    } else if path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
    {
        MediaKind::Supplementary
    } else {
        MediaKind::Unknown
    }
}

/// Classify one file by MIME type, probing codecs for videos.
pub async fn classify(tools: &dyn MediaTools, video: &VideoConfig, path: PathBuf) -> Classified {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut record = FileRecord {
        path,
        name,
        kind: MediaKind::Unknown,
        mime_type: String::new(),
        video: None,
    };

    let mime_type = match tools.mime_type(&record.path).await {
        Ok(m) => m,
        Err(e) => return Classified { record, error: Some(e) },
    };
    let kind = kind_for(&record.path, &mime_type);
    record.mime_type = mime_type;

    if kind == MediaKind::Video {
        match tools.probe_video(&record.path).await {
            Ok(probe) => {
                record.video = Some(VideoFacts::judge(
                    probe.video_codec,
                    probe.audio_codec,
                    probe.duration_secs,
                    &video.compatible_video_codecs,
                    &video.compatible_audio_codecs,
                ));
            }
            Err(e) => return Classified { record, error: Some(e) },
        }
    }

    record.kind = kind;
    Classified { record, error: None }
}

/// Classify every path with a pool of `workers` tasks.
pub async fn analyze(
    paths: Vec<PathBuf>,
    tools: Arc<dyn MediaTools>,
    video: VideoConfig,
    workers: usize,
    progress: &dyn ProgressSink,
) -> AnalyzedTree {
    let total = paths.len();
    tracing::info!(files = total, workers, "Analyzing files");

    let video = Arc::new(video);
    let mut pool = WorkerPool::spawn(paths, workers, move |path: PathBuf| {
        let tools = Arc::clone(&tools);
        let video = Arc::clone(&video);
        async move { classify(tools.as_ref(), &video, path).await }
    });

    let mut tree = AnalyzedTree::default();
    let mut done = 0;
    while let Some(classified) = pool.next().await {
        done += 1;
        if let Some(e) = &classified.error {
            tracing::warn!(path = %classified.record.path.display(), "Analysis failed: {}", e);
            tree.summary.probe_failures += 1;
        } else {
            tracing::debug!(
                path = %classified.record.path.display(),
                kind = ?classified.record.kind,
                "Classified"
            );
        }
        tree.insert(classified.record);
        progress.update(ProgressEvent::Analyzing { done, total });
    }

    tracing::info!(
        images = tree.images.len(),
        videos = tree.videos.len(),
        supplementary = tree.supplementary.len(),
        unknown = tree.unknown.len(),
        "Analysis complete"
    );
    tree
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::progress::NoProgress;
    use crate::testing::MockTools;
    use crate::tools::VideoProbe;

    #[test]
    fn test_kind_for() {
        assert_eq!(kind_for(Path::new("a.jpg"), "image/jpeg"), MediaKind::Image);
        assert_eq!(kind_for(Path::new("a.mov"), "video/quicktime"), MediaKind::Video);
        assert_eq!(
            kind_for(Path::new("a.jpg.json"), "application/json"),
            MediaKind::Supplementary
        );
        assert_eq!(kind_for(Path::new("a.txt"), "text/plain"), MediaKind::Unknown);
        assert_eq!(kind_for(Path::new("a.bin"), ""), MediaKind::Unknown);
    }

    #[tokio::test]
    async fn test_analyze_partitions_every_file() {
        let tools = MockTools::new();
        tools.set_mime("/src/a.jpg", "image/jpeg");
        tools.set_mime("/src/b.mov", "video/quicktime");
        tools.set_probe(
            "/src/b.mov",
            VideoProbe {
                video_codec: Some("hevc".into()),
                audio_codec: Some("aac".into()),
                duration_secs: 4.0,
            },
        );
        tools.set_mime("/src/a.jpg.json", "application/json");
        tools.set_mime("/src/notes.txt", "text/plain");
        tools.fail_mime("/src/broken.jpg");

        let paths = [
            "/src/a.jpg",
            "/src/b.mov",
            "/src/a.jpg.json",
            "/src/notes.txt",
            "/src/broken.jpg",
        ]
        .iter()
        .map(PathBuf::from)
        .collect();

        let tree = analyze(
            paths,
            Arc::new(tools),
            VideoConfig::default(),
            2,
            &NoProgress,
        )
        .await;

        assert_eq!(tree.total(), 5);
        assert_eq!(tree.images.len(), 1);
        assert_eq!(tree.videos.len(), 1);
        assert_eq!(tree.supplementary.len(), 1);
        assert_eq!(tree.unknown.len(), 2);
        assert_eq!(tree.summary.probe_failures, 1);
        assert_eq!(tree.summary.needs_reencode, 1);
        assert_eq!(tree.summary.image_extensions["jpg"], 1);

        let facts = tree.videos[Path::new("/src/b.mov")].video.as_ref().unwrap();
        assert!(!facts.video_compatible);
        assert!(facts.audio_compatible);
    }
}
