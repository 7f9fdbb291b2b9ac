//! Merging and cleaning of primary and sidecar tag sets.

use chrono::NaiveDateTime;
use std::path::Path;

use crate::types::{StrTag, TagSet};

/// Whether a date is the Unix epoch, which exports use to mean "unset".
pub fn is_epoch(date: &NaiveDateTime) -> bool {
    date.and_utc().timestamp() == 0
}

/// Drop placeholder values from sidecar tags.
///
/// Epoch dates, empty strings and geo coordinates of exactly zero carry no
/// information and would otherwise win date resolution or move a photo to
/// Null Island.
pub fn sanitize(mut tags: TagSet) -> TagSet {
    tags.dates.retain(|_, date| !is_epoch(date));
    tags.misc.retain(|_, value| !value.is_empty());
    tags.geo.retain(|_, value| {
        if value.is_empty() {
            return false;
        }
        value.trim().parse::<f64>().map_or(true, |f| f != 0.0)
    });
    tags
}

/// Primary geo tags followed by sidecar geo tags. A name present in both
/// appears twice; the writer applies the later value.
pub fn merge_geo(primary: &TagSet, supplementary: &TagSet) -> Vec<StrTag> {
    primary.geo_tags().chain(supplementary.geo_tags()).collect()
}

/// Misc tags stamped onto the output. Everything else in the misc set is
/// either carried by `-TagsFromFile` already or not writable.
pub const WRITABLE_MISC: &[&str] = &["ImageDescription"];

/// Primary misc tags followed by sidecar misc tags, limited to
/// [`WRITABLE_MISC`]. A later duplicate wins, as with geo.
pub fn merge_misc(primary: &TagSet, supplementary: &TagSet) -> Vec<StrTag> {
    primary
        .misc_tags()
        .chain(supplementary.misc_tags())
        .filter(|tag| WRITABLE_MISC.contains(&tag.name.as_str()))
        .collect()
}

/// Title stamped onto the output: the source base name without extension.
pub fn stamp_title(source: &Path) -> String {
    source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
