//! End-to-end export runs against scripted tools.

use chrono::NaiveDate;
use redate_core::config::IncompatiblePolicy;
use redate_core::testing::{MockCall, MockTools};
use redate_core::tools::VideoProbe;
use redate_core::types::StrTag;
use redate_core::{
    Config, DateSource, Exporter, LogEntry, Outcome, PipelineLog, ProgressEvent, ProgressSink,
    TagSet,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl ProgressSink for RecordingProgress {
    fn update(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

struct Tree {
    _dir: tempfile::TempDir,
    src: PathBuf,
    dest: PathBuf,
    tools: MockTools,
}

impl Tree {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("Takeout");
        fs::create_dir_all(&src).unwrap();
        let dest = dir.path().join("Takeout_Export");
        Self {
            _dir: dir,
            src,
            dest,
            tools: MockTools::new(),
        }
    }

    fn file(&self, rel: &str, mime: &str, body: &[u8]) -> PathBuf {
        let path = self.src.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, body).unwrap();
        self.tools.set_mime(&path, mime);
        path
    }

    fn exporter(&self, config: Config) -> Exporter {
        Exporter::new(config, Arc::new(self.tools.clone()))
    }

    fn log(&self) -> Vec<LogEntry> {
        PipelineLog::load(&self.dest.join("log.json")).unwrap()
    }

    fn entry(&self, src: &Path) -> LogEntry {
        self.log()
            .into_iter()
            .find(|e| e.src_path == src)
            .unwrap_or_else(|| panic!("no log entry for {}", src.display()))
    }
}

fn dated(name: &str, y: i32, m: u32, d: u32) -> TagSet {
    let mut tags = TagSet::default();
    tags.dates.insert(
        name.into(),
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap(),
    );
    tags
}

fn names_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_dated_and_undatable_images() {
    let tree = Tree::new();
    let good = tree.file("good.jpg", "image/jpeg", b"good");
    let bad = tree.file("9999999999.jpg", "image/jpeg", b"bad");
    tree.tools.set_tags(&good, dated("DateTimeOriginal", 2019, 5, 5));

    let summary = tree
        .exporter(Config::default())
        .run(&tree.src, &tree.dest, &redate_core::NoProgress)
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(
        names_in(&tree.dest.join("success")),
        vec!["2019-05-05_10-00-00_good.jpg"]
    );
    assert_eq!(names_in(&tree.dest.join("fail")), vec!["9999999999.jpg"]);
    assert_eq!(
        fs::read(tree.dest.join("fail/9999999999.jpg")).unwrap(),
        b"bad"
    );
    assert!(!tree.dest.join(".tmp").exists());

    let entry = tree.entry(&good);
    assert_eq!(entry.outcome, Outcome::Success);
    assert_eq!(entry.date_source, Some(DateSource::ExifTag));
}

#[tokio::test]
async fn test_one_log_entry_per_media_file() {
    let tree = Tree::new();
    let mut media = Vec::new();
    for i in 0..25 {
        let path = tree.file(&format!("album/photo_{i}.jpg"), "image/jpeg", b"x");
        if i % 3 != 0 {
            tree.tools.set_tags(&path, dated("CreateDate", 2015, 1 + i % 12, 1));
        }
        media.push(path);
    }
    for i in 0..5 {
        media.push(tree.file(&format!("clips/clip_{i}.mp4"), "video/mp4", b"v"));
    }
    tree.file("album/photo_1.jpg.json", "application/json", b"{}");
    tree.file("notes.txt", "text/plain", b"n");
    tree.file(".DS_Store", "application/octet-stream", b"");

    let mut config = Config::default();
    config.pipeline.analysis_workers = 3;
    config.pipeline.conversion_workers = 4;
    let summary = tree
        .exporter(config)
        .run(&tree.src, &tree.dest, &redate_core::NoProgress)
        .await
        .unwrap();

    assert_eq!(summary.discovered, 32);
    assert_eq!(summary.images, 25);
    assert_eq!(summary.videos, 5);
    assert_eq!(summary.supplementary, 1);
    assert_eq!(summary.unknown, 1);
    assert_eq!(summary.succeeded + summary.failed, 30);

    let log = tree.log();
    assert_eq!(log.len(), media.len());
    for path in &media {
        assert_eq!(log.iter().filter(|e| &e.src_path == path).count(), 1);
    }
    assert!(log
        .iter()
        .all(|e| matches!(e.outcome, Outcome::Success | Outcome::Fail)));

    let landed = names_in(&tree.dest.join("success")).len() + names_in(&tree.dest.join("fail")).len();
    assert_eq!(landed, 30);
}

#[tokio::test]
async fn test_images_convert_before_videos() {
    let tree = Tree::new();
    let clip = tree.file("a_clip.mov", "video/quicktime", b"v");
    let photo = tree.file("z_photo.jpg", "image/jpeg", b"i");
    tree.tools.set_tags(&clip, dated("CreateDate", 2020, 2, 2));
    tree.tools.set_tags(&photo, dated("CreateDate", 2020, 2, 2));

    let progress = RecordingProgress::default();
    tree.exporter(Config::default())
        .run(&tree.src, &tree.dest, &progress)
        .await
        .unwrap();

    let log = tree.log();
    assert_eq!(log[0].src_path, photo);
    assert_eq!(log[1].src_path, clip);

    let events = progress.events.lock().unwrap();
    assert!(matches!(events.first(), Some(ProgressEvent::Counting)));
    assert!(matches!(events.last(), Some(ProgressEvent::Complete(_))));
    assert!(events
        .iter()
        .any(|e| matches!(e, ProgressEvent::Analyzed(s) if s.image_extensions["jpg"] == 1)));
}

#[tokio::test]
async fn test_sidecar_supplies_date_and_geo() {
    let tree = Tree::new();
    let photo = tree.file("IMG_0042.jpg", "image/jpeg", b"i");
    let sidecar = tree.file(
        "IMG_0042.jpg.json",
        "application/json",
        br#"{
            "title": "IMG_0042.jpg",
            "description": "Brandenburger Tor",
            "photoTakenTime": {"timestamp": "1551571200"},
            "geoData": {"latitude": 52.52, "longitude": 13.405, "altitude": 0.0}
        }"#,
    );

    tree.exporter(Config::default())
        .run(&tree.src, &tree.dest, &redate_core::NoProgress)
        .await
        .unwrap();

    let entry = tree.entry(&photo);
    assert_eq!(entry.outcome, Outcome::Success, "{:?}", entry.errors);
    assert_eq!(entry.sidecar_path, Some(sidecar));
    assert_eq!(
        entry.resolved_date,
        NaiveDate::from_ymd_opt(2019, 3, 3).unwrap().and_hms_opt(0, 0, 0)
    );
    assert!(!entry.supplementary_tags.contains_key("GPSAltitude"));

    let writes = tree
        .tools
        .calls_matching(|c| matches!(c, MockCall::WriteTags(_)));
    let MockCall::WriteTags(request) = &writes[0] else {
        unreachable!()
    };
    assert_eq!(request.title, "IMG_0042");
    assert_eq!(
        request.misc,
        vec![StrTag::new("ImageDescription", "Brandenburger Tor")]
    );
    let geo: Vec<&str> = request.geo.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(geo, vec!["GPSLatitude", "GPSLongitude"]);
}

#[tokio::test]
async fn test_video_policies() {
    let tree = Tree::new();
    let ok = tree.file("ok.mov", "video/quicktime", b"ok-bytes");
    let odd = tree.file("odd.mkv", "video/x-matroska", b"odd-bytes");
    tree.tools.set_probe(
        &ok,
        VideoProbe {
            video_codec: Some("h264".into()),
            audio_codec: Some("aac".into()),
            duration_secs: 3.0,
        },
    );
    tree.tools.set_probe(
        &odd,
        VideoProbe {
            video_codec: Some("vp9".into()),
            audio_codec: Some("opus".into()),
            duration_secs: 5.0,
        },
    );
    tree.tools.set_tags(&ok, dated("CreateDate", 2022, 8, 1));
    tree.tools.set_tags(&odd, dated("CreateDate", 2022, 8, 2));

    let mut config = Config::default();
    config.video.incompatible = IncompatiblePolicy::Reencode;
    tree.exporter(config)
        .run(&tree.src, &tree.dest, &redate_core::NoProgress)
        .await
        .unwrap();

    let success = tree.dest.join("success");
    assert_eq!(
        names_in(&success),
        vec!["2022-08-01_10-00-00_ok.mp4", "2022-08-02_10-00-00_odd.mp4"]
    );
    assert_eq!(
        fs::read(success.join("2022-08-01_10-00-00_ok.mp4")).unwrap(),
        b"ok-bytes"
    );
    assert_ne!(
        fs::read(success.join("2022-08-02_10-00-00_odd.mp4")).unwrap(),
        b"odd-bytes"
    );

    let entry = tree.entry(&odd);
    assert!(entry.video_facts.unwrap().needs_reencode);
}

#[tokio::test]
async fn test_second_run_refuses_existing_destination() {
    let tree = Tree::new();
    tree.file("a.jpg", "image/jpeg", b"a");
    let exporter = tree.exporter(Config::default());
    exporter
        .run(&tree.src, &tree.dest, &redate_core::NoProgress)
        .await
        .unwrap();

    let err = exporter
        .run(&tree.src, &tree.dest, &redate_core::NoProgress)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("already exists"));
}
