//! Google Photos JSON sidecars: locating the one that belongs to a media
//! file and turning it into a [`TagSet`].

use chrono::DateTime;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::error::PipelineError;
use crate::types::TagSet;

/// Google truncates sidecar file names to this many characters.
const MAX_SIDECAR_NAME: usize = 51;

static BRACKET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(\d+\)\.").unwrap());

/// Every supplementary file discovered in the source tree, by absolute path.
#[derive(Debug, Clone, Default)]
pub struct SidecarIndex {
    paths: BTreeSet<PathBuf>,
}

impl SidecarIndex {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            paths: paths.into_iter().collect(),
        }
    }

    /// The sidecar most likely describing `media`, trying the exact
    /// `name.ext.json` first and Google's mangled spellings after it.
    pub fn find(&self, media: &Path) -> Option<&Path> {
        let dir = media.parent()?;
        let file_name = media.file_name()?.to_str()?;

        candidate_names(file_name)
            .into_iter()
            .map(|name| dir.join(name))
            .find_map(|candidate| self.paths.get(&candidate).map(PathBuf::as_path))
    }
}

fn candidate_names(file_name: &str) -> Vec<String> {
    let mut names = vec![format!("{file_name}.json")];

    let shortened = shorten_name(file_name);
    if shortened != file_name {
        names.push(format!("{shortened}.json"));
    }

    let swapped = bracket_swap(file_name);
    if swapped != file_name {
        names.push(format!("{swapped}.json"));
    }

    if let Some(stem) = Path::new(file_name).file_stem().and_then(|s| s.to_str()) {
        if stem != file_name {
            names.push(format!("{stem}.json"));
        }
    }

    names.dedup();
    names
}

fn shorten_name(file_name: &str) -> &str {
    let max_len = MAX_SIDECAR_NAME - ".json".len();
    if file_name.len() + ".json".len() <= MAX_SIDECAR_NAME {
        return file_name;
    }
    let mut end = max_len;
    while end > 0 && !file_name.is_char_boundary(end) {
        end -= 1;
    }
    &file_name[..end]
}

/// `name(1).jpg` → `name.jpg(1)`
fn bracket_swap(file_name: &str) -> String {
    if let Some(m) = BRACKET_RE.find_iter(file_name).last() {
        let bracket = m.as_str().trim_end_matches('.');
        let mut result = String::with_capacity(file_name.len());
        result.push_str(&file_name[..m.start()]);
        result.push_str(&file_name[m.start() + bracket.len()..]);
        result.push_str(bracket);
        return result;
    }
    file_name.to_string()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GoogleMetadata {
    title: Option<String>,
    description: Option<String>,
    photo_taken_time: Option<Timestamp>,
    photo_last_modified_time: Option<Timestamp>,
    geo_data: Option<GeoData>,
    geo_data_exif: Option<GeoData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Timestamp {
    timestamp: Option<Value>,
}

impl Timestamp {
    /// Exports carry the epoch seconds as a string; accept numbers too.
    fn date(&self) -> Option<chrono::NaiveDateTime> {
        let secs = match self.timestamp.as_ref()? {
            Value::String(s) => s.trim().parse::<i64>().ok()?,
            Value::Number(n) => n.as_i64()?,
            _ => return None,
        };
        DateTime::from_timestamp(secs, 0).map(|d| d.naive_utc())
    }
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(default)]
struct GeoData {
    latitude: f64,
    longitude: f64,
    altitude: f64,
}

impl GeoData {
    fn is_zero(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0 && self.altitude == 0.0
    }
}

/// Parse sidecar JSON into raw, unsanitized tags.
pub fn parse_sidecar(bytes: &[u8]) -> Result<TagSet, serde_json::Error> {
    use serde::de::Error as _;

    let meta: Option<GoogleMetadata> = serde_json::from_slice(bytes)?;
    let meta = meta.ok_or_else(|| serde_json::Error::custom("supplementary file is empty"))?;

    let mut tags = TagSet::default();
    if let Some(title) = meta.title {
        tags.misc.insert("ImageTitle".into(), title);
    }
    if let Some(description) = meta.description {
        tags.misc.insert("ImageDescription".into(), description);
    }

    if let Some(date) = meta.photo_last_modified_time.as_ref().and_then(Timestamp::date) {
        tags.dates.insert("DateTime".into(), date);
    }
    if let Some(date) = meta.photo_taken_time.as_ref().and_then(Timestamp::date) {
        tags.dates.insert("DateTimeOriginal".into(), date);
        tags.dates.insert("DateTimeDigitized".into(), date);
    }

    let geo = match (meta.geo_data, meta.geo_data_exif) {
        (Some(g), Some(exif)) if g.is_zero() => Some(exif),
        (Some(g), _) => Some(g),
        (None, exif) => exif,
    };
    if let Some(geo) = geo {
        tags.geo.insert("GPSLatitude".into(), geo.latitude.to_string());
        tags.geo.insert("GPSLongitude".into(), geo.longitude.to_string());
        tags.geo.insert("GPSAltitude".into(), geo.altitude.to_string());
    }

    Ok(tags)
}

/// Read and parse a sidecar from disk.
pub async fn read_sidecar(path: &Path) -> Result<TagSet, PipelineError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| PipelineError::Sidecar {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    parse_sidecar(&bytes).map_err(|e| PipelineError::Sidecar {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
