//! Deterministic synthetic data source.
//!
//! Every (seed, symbol, timeframe, day) maps to its own RNG stream via BLAKE3,
//! so the bars for a day are identical no matter which days are requested, in
//! what order, or on which thread. Useful offline and in tests.

use super::provider::{DataSource, DayFetch, RawDayBars};
use crate::error::Result;
use crate::time::{TimeRange, Timeframe, Timestamp};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Random-walk bar generator.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    seed: u64,
    available: Option<TimeRange>,
    unknown_symbols: Vec<String>,
    empty_days: Vec<NaiveDate>,
    fetches: Arc<AtomicUsize>,
}

impl SyntheticSource {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            available: None,
            unknown_symbols: Vec::new(),
            empty_days: Vec::new(),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Restrict the declared availability window.
    pub fn with_available(mut self, period: TimeRange) -> Self {
        self.available = Some(period);
        self
    }

    /// Symbols this source reports as not found.
    pub fn with_unknown_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.unknown_symbols.push(symbol.into());
        self
    }

    /// Days that exist but carry no bars (market holidays).
    pub fn with_empty_day(mut self, day: NaiveDate) -> Self {
        self.empty_days.push(day);
        self
    }

    /// Number of `fetch_day` calls so far, shared across clones.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn day_seed(&self, symbol: &str, timeframe: Timeframe, day: NaiveDate) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.seed.to_le_bytes());
        hasher.update(symbol.as_bytes());
        hasher.update(timeframe.label().as_bytes());
        hasher.update(day.to_string().as_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }

    fn base_price(&self, symbol: &str) -> f64 {
        let hash = blake3::hash(symbol.as_bytes());
        let raw = u16::from_le_bytes([hash.as_bytes()[0], hash.as_bytes()[1]]);
        50.0 + f64::from(raw) / f64::from(u16::MAX) * 450.0
    }

    fn generate(&self, symbol: &str, timeframe: Timeframe, day: NaiveDate) -> RawDayBars {
        let mut rng = StdRng::seed_from_u64(self.day_seed(symbol, timeframe, day));
        let n = timeframe.bars_per_day();
        let step = timeframe.duration_ms();
        let day_start = Timestamp::start_of_day(day).millis();

        let mut bars = RawDayBars::empty();
        let mut price = self.base_price(symbol) * (1.0 + rng.gen_range(-0.05..0.05));
        for i in 0..n {
            let open = price;
            let close = open * (1.0 + rng.gen_range(-0.01..0.01));
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.005));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.005));
            let volume = rng.gen_range(10.0..1000.0);
            bars.push(
                Timestamp::from_millis(day_start + i as i64 * step),
                open,
                high,
                low,
                close,
                volume,
            );
            price = close;
        }
        bars
    }
}

impl DataSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch_day(&self, symbol: &str, timeframe: Timeframe, day: NaiveDate) -> Result<DayFetch> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if self.unknown_symbols.iter().any(|s| s == symbol) {
            return Ok(DayFetch::NotFound);
        }
        if let Some(period) = &self.available {
            if !period.overlaps(&TimeRange::days(day, day)?) {
                return Ok(DayFetch::NotFound);
            }
        }
        if self.empty_days.contains(&day) {
            return Ok(DayFetch::Bars(RawDayBars::empty()));
        }
        Ok(DayFetch::Bars(self.generate(symbol, timeframe, day)))
    }

    fn available_period(&self, _symbol: &str, _timeframe: Timeframe) -> Option<TimeRange> {
        self.available
    }
}
