//! Data source trait and the per-day bar payload it produces.
//!
//! The DataSource trait abstracts over connectors (Binance REST, CSV directory,
//! synthetic generator) so they can be swapped and mocked for tests.
//! The day cache sits above this trait; sources do not know about the cache.

use crate::error::{BarlabError, Result};
use crate::series::IndicatorData;
use crate::time::{TimeRange, Timeframe, Timestamp};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One calendar day of bars for one (symbol, timeframe).
///
/// Parallel columns of equal length; `time` is strictly increasing,
/// aligned to the timeframe, and inside the day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDayBars {
    pub time: Vec<Timestamp>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub volume: Vec<f64>,
}

impl RawDayBars {
    /// A valid day with no bars (exchange holiday, halted market).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn push(&mut self, time: Timestamp, open: f64, high: f64, low: f64, close: f64, volume: f64) {
        self.time.push(time);
        self.open.push(open);
        self.high.push(high);
        self.low.push(low);
        self.close.push(close);
        self.volume.push(volume);
    }

    /// Check the structural invariants against the day and timeframe it claims to cover.
    pub fn validate(&self, symbol: &str, timeframe: Timeframe, day: NaiveDate) -> Result<()> {
        let invalid = |reason: String| BarlabError::InvalidSourceData {
            symbol: symbol.to_string(),
            day,
            reason,
        };

        let n = self.time.len();
        let lengths = [
            ("open", self.open.len()),
            ("high", self.high.len()),
            ("low", self.low.len()),
            ("close", self.close.len()),
            ("volume", self.volume.len()),
        ];
        for (name, len) in lengths {
            if len != n {
                return Err(invalid(format!("column '{name}' has {len} values, time has {n}")));
            }
        }

        let day_begin = Timestamp::start_of_day(day);
        let day_end = Timestamp::end_of_day(day);
        for (i, t) in self.time.iter().enumerate() {
            if !timeframe.is_aligned(*t) {
                return Err(invalid(format!("bar {i} at {t} is not aligned to {timeframe}")));
            }
            if *t < day_begin || *t > day_end {
                return Err(invalid(format!("bar {i} at {t} is outside the day")));
            }
            if i > 0 && self.time[i - 1] >= *t {
                return Err(invalid(format!("time is not strictly increasing at bar {i}")));
            }
        }
        Ok(())
    }

    /// Concatenate days (already in chronological order) into one OHLCV container.
    pub fn concat(days: &[RawDayBars], timeframe: Timeframe) -> Result<IndicatorData> {
        let total: usize = days.iter().map(|d| d.len()).sum();
        let mut out = RawDayBars {
            time: Vec::with_capacity(total),
            open: Vec::with_capacity(total),
            high: Vec::with_capacity(total),
            low: Vec::with_capacity(total),
            close: Vec::with_capacity(total),
            volume: Vec::with_capacity(total),
        };
        for day in days {
            out.time.extend_from_slice(&day.time);
            out.open.extend_from_slice(&day.open);
            out.high.extend_from_slice(&day.high);
            out.low.extend_from_slice(&day.low);
            out.close.extend_from_slice(&day.close);
            out.volume.extend_from_slice(&day.volume);
        }
        out.into_series(timeframe)
    }

    pub fn into_series(self, timeframe: Timeframe) -> Result<IndicatorData> {
        IndicatorData::builder("OHLCV", timeframe, self.time)
            .column("open", self.open)
            .column("high", self.high)
            .column("low", self.low)
            .column("close", self.close)
            .column("volume", self.volume)
            .build()
    }
}

/// Outcome of asking a source for one day.
///
/// `NotFound` means the source has no data for this symbol/day at all.
/// `Bars` with zero rows is a valid empty day and becomes a gap, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum DayFetch {
    Bars(RawDayBars),
    NotFound,
}

/// Trait for market data connectors.
///
/// Implementations handle the specifics of fetching one day of bars from a
/// particular source. `name()` is part of every cache key, so it must be stable
/// across runs and unique per source.
pub trait DataSource: Send + Sync {
    /// Stable identifier used in cache-key derivation.
    fn name(&self) -> &str;

    /// One-time setup, invoked once when the source is bound to a session.
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    /// Fetch exactly one calendar day of bars.
    fn fetch_day(&self, symbol: &str, timeframe: Timeframe, day: NaiveDate) -> Result<DayFetch>;

    /// Period for which the source can have data. `None` means unbounded.
    fn available_period(&self, _symbol: &str, _timeframe: Timeframe) -> Option<TimeRange> {
        None
    }
}

impl<T: DataSource + ?Sized> DataSource for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn init(&mut self) -> Result<()> {
        (**self).init()
    }

    fn fetch_day(&self, symbol: &str, timeframe: Timeframe, day: NaiveDate) -> Result<DayFetch> {
        (**self).fetch_day(symbol, timeframe, day)
    }

    fn available_period(&self, symbol: &str, timeframe: Timeframe) -> Option<TimeRange> {
        (**self).available_period(symbol, timeframe)
    }
}
