//! Millisecond-precision UTC instant.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MS_PER_SECOND: i64 = 1_000;
pub const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
pub const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
pub const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// Milliseconds since the Unix epoch, interpreted as a naive UTC instant.
///
/// All arithmetic is exact integer arithmetic; there is no timezone handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const MIN: Timestamp = Timestamp(i64::MIN);
    pub const MAX: Timestamp = Timestamp(i64::MAX);

    pub const fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub const fn millis(self) -> i64 {
        self.0
    }

    pub fn from_naive(dt: NaiveDateTime) -> Self {
        Self(dt.and_utc().timestamp_millis())
    }

    /// Midnight at the start of `date`.
    pub fn start_of_day(date: NaiveDate) -> Self {
        Self(days_since_epoch(date) * MS_PER_DAY)
    }

    /// Last millisecond of `date` (`23:59:59.999`).
    pub fn end_of_day(date: NaiveDate) -> Self {
        Self(Self::start_of_day(date).0 + MS_PER_DAY - 1)
    }

    pub fn to_naive(self) -> Option<NaiveDateTime> {
        DateTime::from_timestamp_millis(self.0).map(|dt| dt.naive_utc())
    }

    /// Calendar day containing this instant, saturating at chrono's date range.
    pub fn date(self) -> NaiveDate {
        let days = self.0.div_euclid(MS_PER_DAY);
        chrono::Duration::try_days(days)
            .and_then(|d| epoch_date().checked_add_signed(d))
            .unwrap_or(if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
    }

    pub fn saturating_add_millis(self, ms: i64) -> Self {
        Self(self.0.saturating_add(ms))
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(dt: NaiveDateTime) -> Self {
        Self::from_naive(dt)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_naive() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.3f")),
            None if *self == Timestamp::MIN => f.write_str("-inf"),
            None if *self == Timestamp::MAX => f.write_str("+inf"),
            None => write!(f, "{}ms", self.0),
        }
    }
}

fn epoch_date() -> NaiveDate {
    DateTime::UNIX_EPOCH.date_naive()
}

fn days_since_epoch(date: NaiveDate) -> i64 {
    (date - epoch_date()).num_days()
}
