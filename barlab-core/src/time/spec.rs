//! Caller-facing time specifications and their normalization.
//!
//! A `TimeSpec` is one of a closed set of shapes. Date-only shapes expand to the
//! first or last millisecond of the day depending on whether the value is used
//! as a begin or an end bound. Shapes carrying a time of day are used as-is.
//! Timeframe alignment is a separate, later step.

use super::timestamp::Timestamp;
use crate::error::{BarlabError, Result};
use chrono::{NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// A begin or end bound as supplied by a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeSpec {
    /// A calendar date without time of day.
    CalendarDate(NaiveDate),
    /// A date with an explicit time of day.
    DateTime(NaiveDateTime),
    /// An already-canonical instant.
    Timestamp(Timestamp),
    /// Text: `YYYYMMDD`, `YYYY-MM-DD`, or an ISO-8601 date-time.
    Formatted(String),
}

impl TimeSpec {
    /// Resolve to a canonical instant.
    ///
    /// `is_end` selects the end-of-day expansion for date-only values.
    pub fn normalize(&self, is_end: bool) -> Result<Timestamp> {
        match self {
            TimeSpec::CalendarDate(date) => Ok(expand_date(*date, is_end)),
            TimeSpec::DateTime(dt) => Ok(Timestamp::from_naive(*dt)),
            TimeSpec::Timestamp(ts) => Ok(*ts),
            TimeSpec::Formatted(text) => normalize_text(text, is_end),
        }
    }
}

/// Free-function form of [`TimeSpec::normalize`].
pub fn normalize(value: &TimeSpec, is_end: bool) -> Result<Timestamp> {
    value.normalize(is_end)
}

fn expand_date(date: NaiveDate, is_end: bool) -> Timestamp {
    if is_end {
        Timestamp::end_of_day(date)
    } else {
        Timestamp::start_of_day(date)
    }
}

fn normalize_text(text: &str, is_end: bool) -> Result<Timestamp> {
    let text = text.trim();

    if let Some(date) = parse_compact_date(text) {
        return Ok(expand_date(date, is_end));
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(expand_date(date, is_end));
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Ok(Timestamp::from_naive(dt));
        }
    }

    Err(BarlabError::InvalidTimeSpec(format!(
        "unrecognized time value '{text}'"
    )))
}

/// `YYYYMMDD` with exactly eight ASCII digits.
fn parse_compact_date(text: &str) -> Option<NaiveDate> {
    if text.len() != 8 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = text[0..4].parse().ok()?;
    let month: u32 = text[4..6].parse().ok()?;
    let day: u32 = text[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

impl From<NaiveDate> for TimeSpec {
    fn from(date: NaiveDate) -> Self {
        TimeSpec::CalendarDate(date)
    }
}

impl From<NaiveDateTime> for TimeSpec {
    fn from(dt: NaiveDateTime) -> Self {
        TimeSpec::DateTime(dt)
    }
}

impl From<Timestamp> for TimeSpec {
    fn from(ts: Timestamp) -> Self {
        TimeSpec::Timestamp(ts)
    }
}

impl From<&str> for TimeSpec {
    fn from(text: &str) -> Self {
        TimeSpec::Formatted(text.to_string())
    }
}

impl From<String> for TimeSpec {
    fn from(text: String) -> Self {
        TimeSpec::Formatted(text)
    }
}

// Integer calendar dates (`20220901`) travel as text and are parsed as `YYYYMMDD`.
impl From<i32> for TimeSpec {
    fn from(value: i32) -> Self {
        TimeSpec::Formatted(value.to_string())
    }
}

impl From<u32> for TimeSpec {
    fn from(value: u32) -> Self {
        TimeSpec::Formatted(value.to_string())
    }
}

impl From<i64> for TimeSpec {
    fn from(value: i64) -> Self {
        TimeSpec::Formatted(value.to_string())
    }
}
