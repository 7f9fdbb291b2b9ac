//! Capture date resolution.
//!
//! Embedded tags and sidecar tags are both untrusted: cameras reset their
//! clocks, editors rewrite modify dates and exports stamp upload times. The
//! earliest plausible timestamp is taken as the capture date. Only when no
//! tag survives is the file name (plus the sidecar title) searched.

use crate::error::PipelineError;
use crate::types::{DateSource, DateTag, ResolvedDate, TagSet};

use super::text_date;

/// Earliest date among primary tags (minus file system dates) and sidecar
/// tags. Ties keep the first seen: primary before sidecar, then name order.
///
/// Sidecar tags are taken as given; strip placeholders with
/// [`super::reconcile::sanitize`] first.
pub fn earliest_tag(primary: &TagSet, supplementary: &TagSet) -> Option<DateTag> {
    primary
        .date_tags()
        .filter(|tag| !tag.name.contains("File"))
        .chain(supplementary.date_tags())
        .fold(None, |best: Option<DateTag>, tag| match best {
            Some(b) if b.value <= tag.value => Some(b),
            _ => Some(tag),
        })
}

/// Text searched when no tag carries a date: the file name, then the
/// sidecar title if there is one.
pub fn search_text(file_name: &str, supplementary: &TagSet) -> String {
    match supplementary.misc.get("ImageTitle") {
        Some(title) if !title.is_empty() => format!("{file_name} {title}"),
        _ => file_name.to_string(),
    }
}

/// Pick the capture date for a file.
pub fn resolve_date(
    file_name: &str,
    primary: &TagSet,
    supplementary: &TagSet,
) -> Result<ResolvedDate, PipelineError> {
    if let Some(tag) = earliest_tag(primary, supplementary) {
        return Ok(ResolvedDate {
            date: tag.value,
            source: DateSource::ExifTag,
            detail: tag.name,
        });
    }

    let text = search_text(file_name, supplementary);
    match text_date::find_date(&text) {
        Ok(date) => Ok(ResolvedDate {
            date,
            source: DateSource::FileName,
            detail: text,
        }),
        Err(e) => {
            tracing::debug!(file = file_name, "No date in name: {}", e);
            Err(PipelineError::DateResolution)
        }
    }
}
