//! Closed instant ranges.

use super::timestamp::Timestamp;
use crate::error::{BarlabError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// `[begin, end]`, both inclusive, with `begin <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    begin: Timestamp,
    end: Timestamp,
}

impl TimeRange {
    pub fn new(begin: Timestamp, end: Timestamp) -> Result<Self> {
        if begin > end {
            return Err(BarlabError::InvalidRange {
                begin: begin.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { begin, end })
    }

    /// Whole calendar days from `first` through `last`.
    pub fn days(first: NaiveDate, last: NaiveDate) -> Result<Self> {
        Self::new(Timestamp::start_of_day(first), Timestamp::end_of_day(last))
    }

    pub fn unbounded() -> Self {
        Self {
            begin: Timestamp::MIN,
            end: Timestamp::MAX,
        }
    }

    pub fn begin(&self) -> Timestamp {
        self.begin
    }

    pub fn end(&self) -> Timestamp {
        self.end
    }

    pub fn contains(&self, t: Timestamp) -> bool {
        self.begin <= t && t <= self.end
    }

    /// True when `other` lies entirely inside `self`.
    pub fn covers(&self, other: &TimeRange) -> bool {
        self.begin <= other.begin && other.end <= self.end
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.begin <= other.end && other.begin <= self.end
    }

    /// Overlap of two ranges, if any.
    pub fn intersect(&self, other: &TimeRange) -> Option<TimeRange> {
        let begin = self.begin.max(other.begin);
        let end = self.end.min(other.end);
        (begin <= end).then_some(TimeRange { begin, end })
    }

    /// Calendar days touched by this range, ascending.
    pub fn calendar_days(&self) -> Vec<NaiveDate> {
        let last = self.end.date();
        self.begin.date().iter_days().take_while(|d| *d <= last).collect()
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", self.begin, self.end)
    }
}
