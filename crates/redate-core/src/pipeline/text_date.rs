//! Free-text date search for file names and titles.
//!
//! A narrow finder for the date spellings that show up in exported media
//! names: camera stamps, ISO dates, month names, compact digit runs and US
//! dates. The earliest match in the text wins; a tie goes to the pattern
//! listed first.

use chrono::{NaiveDate, NaiveDateTime};
use regex::{Captures, Regex};
use std::sync::LazyLock;
use thiserror::Error;

/// Consecutive digits at or above this length mark a string as an
/// identifier rather than a date.
pub const LONG_DIGIT_RUN: usize = 9;

const MIN_YEAR: i32 = 1800;
const MAX_YEAR: i32 = 2099;

const MONTHS: &str = "january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sept|sep|oct|nov|dec";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TextDateError {
    #[error("'{0}' contains a long numeric string which probably does not represent a date")]
    LongDigitRun(String),

    #[error("no dates found in '{0}'")]
    NotFound(String),
}

struct DatePattern {
    regex: &'static LazyLock<Regex>,
    build: fn(&Captures) -> Option<NaiveDateTime>,
}

fn month_regex(template: &str) -> Regex {
    Regex::new(&template.replace("MONTHS", MONTHS)).unwrap()
}

static RE_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.[A-Za-z][A-Za-z0-9]{0,4}$").unwrap());
static RE_DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"\d{{{},}}", LONG_DIGIT_RUN)).unwrap());

static RE_STAMP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:^|\D)(?P<date>(?P<y>\d{4})[-_.]?(?P<m>\d{2})[-_.]?(?P<d>\d{2})[-_.T ]?(?P<h>\d{2})[-_.:]?(?P<mi>\d{2})[-_.:]?(?P<s>\d{2}))(?:\D|$)").unwrap());
static RE_ISO: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:^|\D)(?P<date>(?P<y>\d{4})[-_.](?P<m>\d{1,2})[-_.](?P<d>\d{1,2}))(?:\D|$)").unwrap());
static RE_MONTH_DAY_YEAR: LazyLock<Regex> = LazyLock::new(|| month_regex(r"(?i)(?:^|[^a-z])(?P<date>(?P<mon>MONTHS)[\s\-_.,]*(?P<d>\d{1,2})(?:st|nd|rd|th)?[\s\-_.,]+(?P<y>\d{4}))(?:\D|$)"));
static RE_DAY_MONTH_YEAR: LazyLock<Regex> = LazyLock::new(|| month_regex(r"(?i)(?:^|\D)(?P<date>(?P<d>\d{1,2})(?:st|nd|rd|th)?[\s\-_.,]*(?P<mon>MONTHS)[\s\-_.,]*(?P<y>\d{4}))(?:\D|$)"));
static RE_COMPACT_YMD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:^|\D)(?P<date>(?P<y>\d{4})(?P<m>\d{2})(?P<d>\d{2}))(?:\D|$)").unwrap());
static RE_COMPACT_MDY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:^|\D)(?P<date>(?P<m>\d{2})(?P<d>\d{2})(?P<y>\d{4}))(?:\D|$)").unwrap());
static RE_US: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:^|\D)(?P<date>(?P<m>\d{1,2})[/-](?P<d>\d{1,2})[/-](?P<y>\d{4}|\d{2}))(?:\D|$)").unwrap());
static RE_MONTH_YEAR: LazyLock<Regex> = LazyLock::new(|| month_regex(r"(?i)(?:^|[^a-z])(?P<date>(?P<mon>MONTHS)[\s\-_.,]*(?P<y>\d{4}))(?:\D|$)"));

static PATTERNS: &[DatePattern] = &[
    DatePattern { regex: &RE_STAMP, build: stamp },
    DatePattern { regex: &RE_ISO, build: numeric_ymd },
    DatePattern { regex: &RE_MONTH_DAY_YEAR, build: named_month },
    DatePattern { regex: &RE_DAY_MONTH_YEAR, build: named_month },
    DatePattern { regex: &RE_COMPACT_YMD, build: numeric_ymd },
    DatePattern { regex: &RE_COMPACT_MDY, build: numeric_ymd },
    DatePattern { regex: &RE_US, build: us_date },
    DatePattern { regex: &RE_MONTH_YEAR, build: named_month },
];

/// Find the most plausible date mentioned in `text`.
pub fn find_date(text: &str) -> Result<NaiveDateTime, TextDateError> {
    let stripped = RE_EXTENSION.replace(text, "");

    if RE_DIGIT_RUN.is_match(&stripped) {
        return Err(TextDateError::LongDigitRun(stripped.into_owned()));
    }

    let best = PATTERNS
        .iter()
        .enumerate()
        .filter_map(|(priority, pat)| {
            first_valid(pat, &stripped).map(|(pos, date)| (pos, priority, date))
        })
        .min_by_key(|(pos, priority, _)| (*pos, *priority));

    match best {
        Some((_, _, date)) => Ok(date),
        None => Err(TextDateError::NotFound(stripped.into_owned())),
    }
}

/// First match of `pat` that is a real calendar date, with its position.
fn first_valid(pat: &DatePattern, text: &str) -> Option<(usize, NaiveDateTime)> {
    let mut start = 0;
    while let Some(caps) = pat.regex.captures_at(text, start) {
        let found = caps.name("date")?;
        if let Some(date) = (pat.build)(&caps) {
            return Some((found.start(), date));
        }
        let width = text[found.start()..].chars().next().map_or(1, char::len_utf8);
        start = found.start() + width;
    }
    None
}

fn num(caps: &Captures, name: &str) -> Option<u32> {
    caps.name(name)?.as_str().parse().ok()
}

fn make(year: i32, month: u32, day: u32, h: u32, mi: u32, s: u32) -> Option<NaiveDateTime> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(h, mi, s)
}

fn stamp(caps: &Captures) -> Option<NaiveDateTime> {
    make(
        num(caps, "y")? as i32,
        num(caps, "m")?,
        num(caps, "d")?,
        num(caps, "h")?,
        num(caps, "mi")?,
        num(caps, "s")?,
    )
}

fn numeric_ymd(caps: &Captures) -> Option<NaiveDateTime> {
    make(num(caps, "y")? as i32, num(caps, "m")?, num(caps, "d")?, 0, 0, 0)
}

fn us_date(caps: &Captures) -> Option<NaiveDateTime> {
    let raw = caps.name("y")?.as_str();
    let mut year = raw.parse::<i32>().ok()?;
    if raw.len() == 2 {
        year += if year < 70 { 2000 } else { 1900 };
    }
    make(year, num(caps, "m")?, num(caps, "d")?, 0, 0, 0)
}

/// Month given by name; a missing day means the first of the month.
fn named_month(caps: &Captures) -> Option<NaiveDateTime> {
    let month = month_number(caps.name("mon")?.as_str())?;
    let day = match caps.name("d") {
        Some(_) => num(caps, "d")?,
        None => 1,
    };
    make(num(caps, "y")? as i32, month, day, 0, 0, 0)
}

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).collect::<String>().to_lowercase();
    let n = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_month_name_dates() {
        assert_eq!(find_date("june-5-2012").unwrap(), day(2012, 6, 5));
        assert_eq!(find_date("vacation-march-3-2019.jpg").unwrap(), day(2019, 3, 3));
        assert_eq!(find_date("Mar 3rd, 2019").unwrap(), day(2019, 3, 3));
        assert_eq!(find_date("party 14 February 2015").unwrap(), day(2015, 2, 14));
        assert_eq!(find_date("trip june 2012").unwrap(), day(2012, 6, 1));
    }

    #[test]
    fn test_numeric_dates() {
        assert_eq!(find_date("03042020").unwrap(), day(2020, 3, 4));
        assert_eq!(find_date("scan_20180117.png").unwrap(), day(2018, 1, 17));
        assert_eq!(find_date("2016.07.04 fireworks").unwrap(), day(2016, 7, 4));
        assert_eq!(find_date("birthday 12/25/19").unwrap(), day(2019, 12, 25));
    }

    #[test]
    fn test_camera_stamps_keep_time() {
        let expected = NaiveDate::from_ymd_opt(2019, 5, 9)
            .unwrap()
            .and_hms_opt(15, 47, 33)
            .unwrap();
        assert_eq!(find_date("IMG_20190509_154733.jpg").unwrap(), expected);
        assert_eq!(
            find_date("Screenshot_2019-05-09-15-47-33.png").unwrap(),
            expected
        );
    }

    #[test]
    fn test_no_date() {
        assert!(matches!(find_date(""), Err(TextDateError::NotFound(_))));
        assert!(matches!(
            find_date("IMG_5863.JPG"),
            Err(TextDateError::NotFound(_))
        ));
        assert!(matches!(find_date("photo20"), Err(TextDateError::NotFound(_))));
        assert!(matches!(
            find_date("marathon 42"),
            Err(TextDateError::NotFound(_))
        ));
    }

    #[test]
    fn test_long_digit_run_rejected() {
        assert!(matches!(
            find_date("img-003948571923.jpg"),
            Err(TextDateError::LongDigitRun(_))
        ));
        assert!(matches!(
            find_date("9999999999.jpg"),
            Err(TextDateError::LongDigitRun(_))
        ));
        // Eight digits is still a date.
        assert!(find_date("19991231").is_ok());
    }

    #[test]
    fn test_invalid_calendar_dates_skipped() {
        assert!(find_date("2019-02-30").is_err());
        assert_eq!(
            find_date("2019-13-01 then 2019-03-04").unwrap(),
            day(2019, 3, 4)
        );
    }

    #[test]
    fn test_earliest_position_wins() {
        assert_eq!(
            find_date("2001-01-01 december 5 1999").unwrap(),
            day(2001, 1, 1)
        );
        assert_eq!(
            find_date("december 5 1999 2001-01-01").unwrap(),
            day(1999, 12, 5)
        );
    }

    #[test]
    fn test_year_out_of_range() {
        assert!(find_date("1700-01-01").is_err());
    }
}
