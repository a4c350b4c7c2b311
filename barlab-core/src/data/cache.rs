//! Day-granular bar cache with Hive-style keys.
//!
//! Layout: `source={SOURCE}/symbol={SYMBOL}/timeframe={TF}/{YYYY-MM-DD}.parquet`
//!
//! Features:
//! - Cache hit returns the stored day without touching the source
//! - Corrupt or invalid entries are ignored and re-fetched
//! - The live day (today, per the injected clock) and later days are never stored
//! - Writes are best-effort; a failed write is logged and the fetched data returned

use super::blob::BlobStore;
use super::clock::Clock;
use super::codec::{decode_day, encode_day};
use super::provider::{DataSource, DayFetch, RawDayBars};
use crate::error::{BarlabError, Result};
use crate::time::Timeframe;
use chrono::NaiveDate;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Identity of one cached day.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub source: String,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub day: NaiveDate,
}

impl CacheKey {
    pub fn new(source: &str, symbol: &str, timeframe: Timeframe, day: NaiveDate) -> Self {
        Self {
            source: source.to_string(),
            symbol: symbol.to_string(),
            timeframe,
            day,
        }
    }

    /// Blob key; a pure function of the four components.
    pub fn blob_key(&self) -> String {
        format!(
            "source={}/symbol={}/timeframe={}/{}.parquet",
            escape_component(&self.source),
            escape_component(&self.symbol),
            self.timeframe,
            self.day.format("%Y-%m-%d")
        )
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.blob_key())
    }
}

/// Percent-escape anything outside `[A-Za-z0-9._-]` so symbols such as
/// `um/ethusdt` stay one path component and distinct inputs stay distinct.
pub fn escape_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        if b.is_ascii_alphanumeric() || b == b'.' || b == b'_' || b == b'-' {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    if out.chars().all(|c| c == '.') {
        // "." and ".." must not become path navigation.
        out = out.replace('.', "%2E");
    }
    out
}

/// Where a day came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayOrigin {
    Cache,
    Source,
}

/// Fetches and caches one calendar day at a time.
pub struct DayCache {
    source: Box<dyn DataSource>,
    store: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
}

impl DayCache {
    pub fn new(
        source: Box<dyn DataSource>,
        store: Arc<dyn BlobStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            store,
            clock,
        }
    }

    pub fn source(&self) -> &dyn DataSource {
        self.source.as_ref()
    }

    pub fn key(&self, symbol: &str, timeframe: Timeframe, day: NaiveDate) -> CacheKey {
        CacheKey::new(self.source.name(), symbol, timeframe, day)
    }

    /// One day of bars, from the cache when possible.
    pub fn get_day(&self, symbol: &str, timeframe: Timeframe, day: NaiveDate) -> Result<RawDayBars> {
        self.get_day_traced(symbol, timeframe, day).map(|(bars, _)| bars)
    }

    /// Like [`get_day`](Self::get_day), also reporting whether the cache served it.
    pub fn get_day_traced(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        day: NaiveDate,
    ) -> Result<(RawDayBars, DayOrigin)> {
        let key = self.key(symbol, timeframe, day);
        let blob_key = key.blob_key();
        let live = day >= self.clock.today();

        if !live {
            if let Some(bars) = self.load(&blob_key, symbol, timeframe, day) {
                debug!(key = %blob_key, bars = bars.len(), "day cache hit");
                return Ok((bars, DayOrigin::Cache));
            }
        }

        let bars = match self.source.fetch_day(symbol, timeframe, day)? {
            DayFetch::Bars(bars) => bars,
            DayFetch::NotFound => {
                return Err(BarlabError::SourceDataNotFound {
                    symbol: symbol.to_string(),
                    timeframe: timeframe.to_string(),
                    day: Some(day),
                })
            }
        };
        bars.validate(symbol, timeframe, day)?;

        if live {
            debug!(key = %blob_key, "live day fetched, not cached");
        } else {
            self.store_day(&blob_key, &bars);
        }
        Ok((bars, DayOrigin::Source))
    }

    fn load(&self, blob_key: &str, symbol: &str, timeframe: Timeframe, day: NaiveDate) -> Option<RawDayBars> {
        let bytes = match self.store.read(blob_key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(key = %blob_key, "day cache miss");
                return None;
            }
            Err(e) => {
                warn!(key = %blob_key, error = %e, "cache read failed, fetching");
                return None;
            }
        };

        match decode_day(&bytes).and_then(|bars| {
            bars.validate(symbol, timeframe, day)?;
            Ok(bars)
        }) {
            Ok(bars) => Some(bars),
            Err(e) => {
                warn!(key = %blob_key, error = %e, "ignoring corrupt cache entry");
                None
            }
        }
    }

    fn store_day(&self, blob_key: &str, bars: &RawDayBars) {
        let written = encode_day(bars).and_then(|bytes| self.store.write(blob_key, &bytes));
        match written {
            Ok(()) => debug!(key = %blob_key, bars = bars.len(), "day cached"),
            Err(e) => warn!(key = %blob_key, error = %e, "cache write failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::blob::MemoryBlobStore;
    use crate::data::clock::FixedClock;
    use crate::data::synthetic::SyntheticSource;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup(today: NaiveDate) -> (DayCache, Arc<MemoryBlobStore>, SyntheticSource) {
        let source = SyntheticSource::new(7);
        let store = Arc::new(MemoryBlobStore::new());
        let cache = DayCache::new(
            Box::new(source.clone()),
            store.clone(),
            Arc::new(FixedClock(today)),
        );
        (cache, store, source)
    }

    #[test]
    fn key_escapes_symbol() {
        let key = CacheKey::new("binance", "um/ethusdt", Timeframe::M5, ymd(2022, 7, 1));
        assert_eq!(
            key.blob_key(),
            "source=binance/symbol=um%2Fethusdt/timeframe=5m/2022-07-01.parquet"
        );
    }

    #[test]
    fn escape_is_injective_on_separator() {
        assert_ne!(escape_component("a/b"), escape_component("a%2Fb"));
        assert_eq!(escape_component(".."), "%2E%2E");
    }

    #[test]
    fn second_request_hits_cache() {
        let (cache, store, source) = setup(ymd(2024, 1, 1));
        let day = ymd(2022, 7, 1);

        let (first, origin1) = cache.get_day_traced("ETHUSDT", Timeframe::M5, day).unwrap();
        let (second, origin2) = cache.get_day_traced("ETHUSDT", Timeframe::M5, day).unwrap();

        assert_eq!(origin1, DayOrigin::Source);
        assert_eq!(origin2, DayOrigin::Cache);
        assert_eq!(first, second);
        assert_eq!(source.fetch_count(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn live_day_is_never_stored() {
        let today = ymd(2022, 7, 1);
        let (cache, store, source) = setup(today);

        cache.get_day("ETHUSDT", Timeframe::H1, today).unwrap();
        cache.get_day("ETHUSDT", Timeframe::H1, today).unwrap();

        assert_eq!(source.fetch_count(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn corrupt_entry_is_refetched_and_replaced() {
        let (cache, store, source) = setup(ymd(2024, 1, 1));
        let day = ymd(2022, 7, 1);
        let key = cache.key("ETHUSDT", Timeframe::M15, day).blob_key();
        store.write(&key, b"garbage").unwrap();

        let bars = cache.get_day("ETHUSDT", Timeframe::M15, day).unwrap();
        assert_eq!(bars.len(), Timeframe::M15.bars_per_day());
        assert_eq!(source.fetch_count(), 1);

        let stored = store.read(&key).unwrap().unwrap();
        assert_eq!(decode_day(&stored).unwrap(), bars);
    }

    #[test]
    fn not_found_propagates() {
        let source = SyntheticSource::new(7).with_unknown_symbol("NOPE");
        let cache = DayCache::new(
            Box::new(source),
            Arc::new(MemoryBlobStore::new()),
            Arc::new(FixedClock(ymd(2024, 1, 1))),
        );
        let err = cache.get_day("NOPE", Timeframe::M5, ymd(2022, 7, 1)).unwrap_err();
        assert!(matches!(err, BarlabError::SourceDataNotFound { .. }));
    }

    struct ReadOnlyStore;

    impl BlobStore for ReadOnlyStore {
        fn read(&self, _key: &str) -> Result<Option<Vec<u8>>> {
            Ok(None)
        }

        fn write(&self, key: &str, _bytes: &[u8]) -> Result<()> {
            Err(BarlabError::Cache(format!("read-only store rejected {key}")))
        }
    }

    #[test]
    fn failed_write_still_returns_fetched_day() {
        let source = SyntheticSource::new(7);
        let cache = DayCache::new(
            Box::new(source.clone()),
            Arc::new(ReadOnlyStore),
            Arc::new(FixedClock(ymd(2024, 1, 1))),
        );
        let day = ymd(2022, 7, 1);

        let (first, origin1) = cache.get_day_traced("ETHUSDT", Timeframe::H1, day).unwrap();
        let (second, origin2) = cache.get_day_traced("ETHUSDT", Timeframe::H1, day).unwrap();

        assert_eq!(first.len(), Timeframe::H1.bars_per_day());
        assert_eq!(first, second);
        assert_eq!(origin1, DayOrigin::Source);
        assert_eq!(origin2, DayOrigin::Source);
        assert_eq!(source.fetch_count(), 2);
    }
}
