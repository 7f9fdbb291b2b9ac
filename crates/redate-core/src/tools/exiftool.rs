//! exiftool invocations and output parsing.

use chrono::NaiveDateTime;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::{run_tool, TagWrite};
use crate::error::{ToolError, ToolResult};
use crate::types::{TagSet, TAG_DATE_FORMAT};

const TOOL: &str = "exiftool";

/// Date output flags shared by every tag read.
const DATE_ARGS: [&str; 7] = [
    "-api",
    "TimeZone=UTC",
    "-d",
    TAG_DATE_FORMAT,
    "-c",
    "%.6f",
    "-j",
];

/// Thin wrapper over the exiftool executable.
#[derive(Debug, Clone)]
pub struct ExifTool {
    program: PathBuf,
}

impl ExifTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub async fn validate(&self) -> ToolResult<()> {
        let out = run_tool(TOOL, &self.program, ["-ver"]).await?;
        tracing::debug!(version = %String::from_utf8_lossy(&out).trim(), "exiftool available");
        Ok(())
    }

    pub async fn mime_type(&self, path: &Path) -> ToolResult<String> {
        let out = run_tool(
            TOOL,
            &self.program,
            [OsString::from("-MIMEType"), "-j".into(), path.into()],
        )
        .await?;
        let tags = parse_first_object(&out)?;
        Ok(tags.get("MIMEType").map(value_to_string).unwrap_or_default())
    }

    /// Read misc, date and geo tags with three separate queries.
    pub async fn read_tags(&self, path: &Path) -> ToolResult<TagSet> {
        let mut tags = TagSet::default();

        let out = run_tool(TOOL, &self.program, with_path(&DATE_ARGS, path)).await?;
        for (name, value) in parse_first_object(&out)? {
            tags.misc.insert(name, value_to_string(&value));
        }

        let mut date_args = vec!["-time:all"];
        date_args.extend_from_slice(&DATE_ARGS);
        let out = run_tool(TOOL, &self.program, with_path(&date_args, path)).await?;
        tags.dates = capture_dates(parse_first_object(&out)?);

        let out = run_tool(
            TOOL,
            &self.program,
            with_path(&["-a", "-gps:all", "-c", "%.6f", "-j"], path),
        )
        .await?;
        for (name, value) in parse_first_object(&out)? {
            tags.geo.insert(name, value_to_string(&value));
        }

        Ok(tags)
    }

    pub async fn write_tags(&self, request: &TagWrite) -> ToolResult<()> {
        run_tool(TOOL, &self.program, write_args(request)).await?;
        Ok(())
    }
}

fn with_path(args: &[&str], path: &Path) -> Vec<OsString> {
    let mut out: Vec<OsString> = args.iter().map(OsString::from).collect();
    out.push(path.into());
    out
}

fn write_args(request: &TagWrite) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-TagsFromFile".into(), request.tags_from.clone().into()];
    args.push(format!("-Title={}", request.title).into());
    args.push(format!("-AllDates={}", request.date.format(TAG_DATE_FORMAT)).into());
    for tag in request.misc.iter().chain(&request.geo) {
        args.push(format!("-{}={}", tag.name, tag.value).into());
    }
    args.push("-o".into());
    args.push(request.output.clone().into());
    args.push(request.working.clone().into());
    args
}

/// Parse exiftool's `[{ "Tag": value, ... }]` shape into the first object,
/// without the `SourceFile` entry.
fn parse_first_object(out: &[u8]) -> ToolResult<Map<String, Value>> {
    if out.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    let parsed: Vec<Map<String, Value>> =
        serde_json::from_slice(out).map_err(|e| ToolError::Parse {
            tool: TOOL.to_string(),
            message: e.to_string(),
        })?;
    let mut first = parsed.into_iter().next().unwrap_or_default();
    first.remove("SourceFile");
    Ok(first)
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Keep tags that look like capture dates.
///
/// Unparseable values, the Unix epoch, bare times (no `Date` in the name) and
/// the colour profile creation date are dropped. File system dates are kept
/// here and filtered by the date resolver.
fn capture_dates(raw: Map<String, Value>) -> BTreeMap<String, NaiveDateTime> {
    raw.into_iter()
        .filter(|(name, _)| name.contains("Date") && name != "ProfileDateTime")
        .filter_map(|(name, value)| {
            let text = value_to_string(&value);
            let date = NaiveDateTime::parse_from_str(&text, TAG_DATE_FORMAT).ok()?;
            (date.and_utc().timestamp() != 0).then_some((name, date))
        })
        .collect()
}
