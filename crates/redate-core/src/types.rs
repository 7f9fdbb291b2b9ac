//! Core data types for the redate export pipeline.
//!
//! These types describe what analysis learns about each discovered file and
//! what the conversion phase records about it.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Timestamp layout shared by exiftool output, exiftool input and the log.
pub const TAG_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Classification assigned to every discovered file during analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    /// Companion metadata file (JSON sidecar)
    Supplementary,
    Unknown,
}

/// Codec facts gathered once per video during analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoFacts {
    /// Video codec name as reported by ffprobe
    pub video_codec: Option<String>,

    /// Audio codec name, absent for silent clips
    pub audio_codec: Option<String>,

    pub video_compatible: bool,
    pub audio_compatible: bool,

    /// Container duration in seconds (0 when unknown)
    pub duration_secs: f64,

    /// True when either stream cannot be stream-copied into MP4
    pub needs_reencode: bool,
}

impl VideoFacts {
    /// Judge codec compatibility against the configured allow-lists.
    pub fn judge(
        video_codec: Option<String>,
        audio_codec: Option<String>,
        duration_secs: f64,
        video_allow: &[String],
        audio_allow: &[String],
    ) -> Self {
        let video_compatible = video_codec
            .as_deref()
            .is_some_and(|c| video_allow.iter().any(|a| a == c));
        let audio_compatible = audio_codec
            .as_deref()
            .map_or(true, |c| audio_allow.iter().any(|a| a == c));

        Self {
            video_codec,
            audio_codec,
            video_compatible,
            audio_compatible,
            duration_secs,
            needs_reencode: !video_compatible || !audio_compatible,
        }
    }
}

/// One classified file. Identity is the absolute path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute path to the source file
    pub path: PathBuf,

    /// Just the filename portion
    pub name: String,

    pub kind: MediaKind,

    /// MIME type reported by exiftool (empty when unknown)
    pub mime_type: String,

    /// Present for videos only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoFacts>,
}

impl FileRecord {
    /// Lowercased extension without the dot, or an empty string.
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }
}

/// A named string-valued tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrTag {
    pub name: String,
    pub value: String,
}

impl StrTag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A named timestamp tag. Timestamps are UTC wall-clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateTag {
    pub name: String,
    pub value: NaiveDateTime,
}

impl DateTag {
    pub fn new(name: impl Into<String>, value: NaiveDateTime) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Metadata read from one file: free-form, date and geo tags keyed by name.
///
/// Ordered maps keep iteration, and therefore tie-breaking, deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagSet {
    pub misc: BTreeMap<String, String>,
    pub dates: BTreeMap<String, NaiveDateTime>,
    pub geo: BTreeMap<String, String>,
}

impl TagSet {
    pub fn is_empty(&self) -> bool {
        self.misc.is_empty() && self.dates.is_empty() && self.geo.is_empty()
    }

    pub fn date_tags(&self) -> impl Iterator<Item = DateTag> + '_ {
        self.dates.iter().map(|(n, d)| DateTag::new(n.clone(), *d))
    }

    pub fn geo_tags(&self) -> impl Iterator<Item = StrTag> + '_ {
        self.geo.iter().map(|(n, v)| StrTag::new(n.clone(), v.clone()))
    }

    pub fn misc_tags(&self) -> impl Iterator<Item = StrTag> + '_ {
        self.misc.iter().map(|(n, v)| StrTag::new(n.clone(), v.clone()))
    }

    /// All tags as one name → string map, as written to the log.
    ///
    /// Dates and geo take precedence over misc values of the same name.
    pub fn flatten(&self) -> BTreeMap<String, String> {
        let mut out = self.misc.clone();
        for (name, date) in &self.dates {
            out.insert(name.clone(), date.format(TAG_DATE_FORMAT).to_string());
        }
        for (name, value) in &self.geo {
            out.insert(name.clone(), value.clone());
        }
        out
    }
}

/// Final disposition of a media file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Fail,
}

/// Where the winning capture date came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DateSource {
    /// An embedded or sidecar tag; detail holds the tag name
    ExifTag,
    /// Free-text search; detail holds the searched string
    FileName,
}

/// The outcome of date resolution for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDate {
    pub date: NaiveDateTime,
    pub source: DateSource,
    pub detail: String,
}

/// Aggregate facts about an analyzed tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Image count per lowercased extension
    pub image_extensions: BTreeMap<String, usize>,

    /// Video count per lowercased extension
    pub video_extensions: BTreeMap<String, usize>,

    pub total_video_secs: f64,

    /// Videos whose codecs cannot be stream-copied into MP4
    pub needs_reencode: usize,

    /// Files whose classification failed
    pub probe_failures: usize,
}

/// Counts and timing for a completed run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub discovered: usize,
    pub images: usize,
    pub videos: usize,
    pub supplementary: usize,
    pub unknown: usize,
    pub succeeded: usize,
    pub failed: usize,

    /// Path of the written audit log
    pub log_path: PathBuf,

    pub elapsed_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn allow(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_silent_h264_needs_no_reencode() {
        let facts = VideoFacts::judge(
            Some("h264".into()),
            None,
            12.5,
            &allow(&["h264"]),
            &allow(&["aac"]),
        );
        assert!(facts.video_compatible);
        assert!(facts.audio_compatible);
        assert!(!facts.needs_reencode);
    }

    #[test]
    fn test_hevc_with_opus_needs_reencode() {
        let facts = VideoFacts::judge(
            Some("hevc".into()),
            Some("opus".into()),
            3.0,
            &allow(&["h264"]),
            &allow(&["aac"]),
        );
        assert!(!facts.video_compatible);
        assert!(!facts.audio_compatible);
        assert!(facts.needs_reencode);
    }

    #[test]
    fn test_flatten_formats_dates() {
        let mut tags = TagSet::default();
        tags.misc.insert("Make".into(), "Canon".into());
        tags.dates.insert(
            "DateTimeOriginal".into(),
            NaiveDate::from_ymd_opt(2019, 5, 5)
                .unwrap()
                .and_hms_opt(10, 30, 0)
                .unwrap(),
        );
        tags.geo.insert("GPSLatitude".into(), "52.5".into());

        let flat = tags.flatten();
        assert_eq!(flat["Make"], "Canon");
        assert_eq!(flat["DateTimeOriginal"], "2019-05-05T10:30:00");
        assert_eq!(flat["GPSLatitude"], "52.5");
    }

    #[test]
    fn test_outcome_and_source_serialization() {
        assert_eq!(serde_json::to_string(&Outcome::Fail).unwrap(), "\"fail\"");
        assert_eq!(
            serde_json::to_string(&DateSource::ExifTag).unwrap(),
            "\"exifTag\""
        );
        assert_eq!(
            serde_json::to_string(&MediaKind::Supplementary).unwrap(),
            "\"supplementary\""
        );
    }
}
