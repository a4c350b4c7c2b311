//! Stitches per-day fragments into one contiguous OHLCV series.
//!
//! Pipeline: validate bounds → availability pre-check → fetch each calendar day
//! through the day cache → concatenate in day order → trim to the
//! timeframe-aligned closed range `[begin_of_tf(begin), begin_of_tf(end)]`.

use super::cache::{DayCache, DayOrigin};
use super::provider::RawDayBars;
use crate::error::{BarlabError, Result};
use crate::series::IndicatorData;
use crate::time::{TimeRange, Timeframe, Timestamp};
use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::{info, warn};

/// Assembled series plus what it took to build it.
#[derive(Debug, Clone)]
pub struct AssemblyReport {
    pub series: IndicatorData,
    /// Days that contributed no bars: empty days and days outside the source's availability.
    pub gaps: Vec<NaiveDate>,
    pub cache_hits: usize,
    pub fetched: usize,
}

/// Drives the day cache across a range.
pub struct SeriesAssembler<'a> {
    cache: &'a DayCache,
    parallel: bool,
}

impl<'a> SeriesAssembler<'a> {
    pub fn new(cache: &'a DayCache) -> Self {
        Self {
            cache,
            parallel: false,
        }
    }

    /// Fetch days concurrently. Results are still stitched in day order.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn assemble(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        begin: Option<Timestamp>,
        end: Option<Timestamp>,
    ) -> Result<IndicatorData> {
        self.assemble_report(symbol, timeframe, begin, end)
            .map(|report| report.series)
    }

    pub fn assemble_report(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        begin: Option<Timestamp>,
        end: Option<Timestamp>,
    ) -> Result<AssemblyReport> {
        let begin = begin.ok_or(BarlabError::MissingBeginTime)?;
        let end = end.ok_or(BarlabError::MissingEndTime)?;
        let range = TimeRange::new(begin, end)?;

        let fetch_range = match self.cache.source().available_period(symbol, timeframe) {
            Some(available) => range.intersect(&available).ok_or_else(|| {
                BarlabError::OutOfPeriod {
                    begin: begin.to_string(),
                    end: end.to_string(),
                    available: available.to_string(),
                }
            })?,
            None => range,
        };

        let fetch_days = fetch_range.calendar_days();
        let mut gaps: Vec<NaiveDate> = range
            .calendar_days()
            .into_iter()
            .filter(|d| fetch_days.binary_search(d).is_err())
            .collect();

        let fetched = self.fetch_days(symbol, timeframe, &fetch_days)?;

        let mut cache_hits = 0;
        let mut days = Vec::with_capacity(fetched.len());
        for (day, (bars, origin)) in fetch_days.iter().zip(fetched) {
            if origin == DayOrigin::Cache {
                cache_hits += 1;
            }
            if bars.is_empty() {
                gaps.push(*day);
            }
            days.push(bars);
        }
        gaps.sort();
        if !gaps.is_empty() {
            warn!(symbol, %timeframe, gaps = gaps.len(), "series has days without bars");
        }

        let series = RawDayBars::concat(&days, timeframe)?
            .slice_time(timeframe.begin_of_tf(begin), timeframe.begin_of_tf(end));

        if series.is_empty() {
            return Err(BarlabError::SourceDataNotFound {
                symbol: symbol.to_string(),
                timeframe: timeframe.to_string(),
                day: None,
            });
        }

        info!(
            symbol,
            %timeframe,
            bars = series.len(),
            days = fetch_days.len(),
            cache_hits,
            "assembled series"
        );

        Ok(AssemblyReport {
            series,
            gaps,
            cache_hits,
            fetched: fetch_days.len() - cache_hits,
        })
    }

    fn fetch_days(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        days: &[NaiveDate],
    ) -> Result<Vec<(RawDayBars, DayOrigin)>> {
        if self.parallel {
            // Indexed parallel collect keeps input order.
            days.par_iter()
                .map(|day| self.cache.get_day_traced(symbol, timeframe, *day))
                .collect()
        } else {
            days.iter()
                .map(|day| self.cache.get_day_traced(symbol, timeframe, *day))
                .collect()
        }
    }
}
