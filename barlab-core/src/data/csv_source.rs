//! Directory of per-day CSV files as a data source.
//!
//! Layout: `{root}/{symbol}/{timeframe}/{YYYY-MM-DD}.csv`, header
//! `time,open,high,low,close,volume`. `time` is either epoch milliseconds or
//! an ISO date-time. A missing file means the day does not exist; a file with
//! only the header is a valid empty day.

use super::cache::escape_component;
use super::provider::{DataSource, DayFetch, RawDayBars};
use crate::error::{BarlabError, Result};
use crate::time::{TimeSpec, Timeframe, Timestamp};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct CsvBar {
    time: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

#[derive(Debug, Clone)]
pub struct CsvSource {
    root: PathBuf,
}

impl CsvSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn day_path(&self, symbol: &str, timeframe: Timeframe, day: NaiveDate) -> PathBuf {
        self.root
            .join(escape_component(symbol))
            .join(timeframe.label())
            .join(format!("{}.csv", day.format("%Y-%m-%d")))
    }

    fn parse_time(raw: &str) -> Result<Timestamp> {
        let raw = raw.trim();
        if let Ok(ms) = raw.parse::<i64>() {
            // Bare 8-digit integers would be ambiguous; epoch ms of any real bar is longer.
            if raw.len() > 8 {
                return Ok(Timestamp::from_millis(ms));
            }
        }
        TimeSpec::from(raw).normalize(false)
    }
}

impl DataSource for CsvSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn init(&mut self) -> Result<()> {
        if !self.root.is_dir() {
            return Err(BarlabError::InvalidConstructorArgument(format!(
                "csv root {} is not a directory",
                self.root.display()
            )));
        }
        Ok(())
    }

    fn fetch_day(&self, symbol: &str, timeframe: Timeframe, day: NaiveDate) -> Result<DayFetch> {
        let path = self.day_path(symbol, timeframe, day);
        if !path.is_file() {
            debug!(path = %path.display(), "no csv for day");
            return Ok(DayFetch::NotFound);
        }

        let mut reader = csv::Reader::from_path(&path)
            .map_err(|e| BarlabError::Source(format!("open {}: {e}", path.display())))?;

        let mut bars = RawDayBars::empty();
        for (i, record) in reader.deserialize::<CsvBar>().enumerate() {
            let row = record.map_err(|e| BarlabError::InvalidSourceData {
                symbol: symbol.to_string(),
                day,
                reason: format!("row {}: {e}", i + 1),
            })?;
            let time = Self::parse_time(&row.time).map_err(|e| BarlabError::InvalidSourceData {
                symbol: symbol.to_string(),
                day,
                reason: format!("row {}: {e}", i + 1),
            })?;
            bars.push(time, row.open, row.high, row.low, row.close, row.volume);
        }
        Ok(DayFetch::Bars(bars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn write_day(src: &CsvSource, symbol: &str, tf: Timeframe, day: NaiveDate, body: &str) {
        let path = src.day_path(symbol, tf, day);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[test]
    fn reads_iso_and_epoch_times() {
        let dir = tempfile::tempdir().unwrap();
        let src = CsvSource::new(dir.path());
        let day = ymd(2022, 7, 1);
        write_day(
            &src,
            "ETHUSDT",
            Timeframe::H1,
            day,
            "time,open,high,low,close,volume\n\
             2022-07-01T00:00:00,10,11,9,10.5,100\n\
             1656637200000,10.5,12,10,11,200\n",
        );

        let DayFetch::Bars(bars) = src.fetch_day("ETHUSDT", Timeframe::H1, day).unwrap() else {
            panic!("expected bars");
        };
        assert_eq!(bars.len(), 2);
        assert_eq!(bars.time[0], Timestamp::start_of_day(day));
        assert_eq!(bars.time[1].millis(), 1_656_637_200_000);
        assert_eq!(bars.close, vec![10.5, 11.0]);
        bars.validate("ETHUSDT", Timeframe::H1, day).unwrap();
    }

    #[test]
    fn missing_file_is_not_found_header_only_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let src = CsvSource::new(dir.path());
        let day = ymd(2022, 12, 25);
        assert_eq!(
            src.fetch_day("ETHUSDT", Timeframe::D1, day).unwrap(),
            DayFetch::NotFound
        );

        write_day(&src, "ETHUSDT", Timeframe::D1, day, "time,open,high,low,close,volume\n");
        assert_eq!(
            src.fetch_day("ETHUSDT", Timeframe::D1, day).unwrap(),
            DayFetch::Bars(RawDayBars::empty())
        );
    }

    #[test]
    fn malformed_row_is_invalid_source_data() {
        let dir = tempfile::tempdir().unwrap();
        let src = CsvSource::new(dir.path());
        let day = ymd(2022, 7, 1);
        write_day(
            &src,
            "X",
            Timeframe::D1,
            day,
            "time,open,high,low,close,volume\n2022-07-01,abc,1,1,1,1\n",
        );
        let err = src.fetch_day("X", Timeframe::D1, day).unwrap_err();
        assert!(matches!(err, BarlabError::InvalidSourceData { .. }));
    }

    #[test]
    fn init_requires_directory() {
        let mut src = CsvSource::new("/definitely/not/here");
        assert!(matches!(
            src.init(),
            Err(BarlabError::InvalidConstructorArgument(_))
        ));
    }
}
