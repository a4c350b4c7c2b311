//! Caller-facing session: one data source, one cache, optional default bounds.
//!
//! Every request resolves its bounds (per-call value, else session default),
//! assembles OHLCV through the day cache, and for indicators hands the series
//! to the registered module.

use crate::data::{
    AssemblyReport, BlobStore, Clock, DataSource, DayCache, SeriesAssembler, SystemClock,
};
use crate::error::{BarlabError, Result};
use crate::indicators::{
    IndicatorModule, IndicatorParams, IndicatorRegistry, SeriesRequest, SeriesSource,
};
use crate::series::IndicatorData;
use crate::time::{TimeRange, TimeSpec, Timeframe, Timestamp};
use std::sync::Arc;
use tracing::debug;

/// Optional per-call bounds. Missing values fall back to the session defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bounds {
    pub begin: Option<TimeSpec>,
    pub end: Option<TimeSpec>,
}

impl Bounds {
    /// Use the session defaults for both bounds.
    pub fn session() -> Self {
        Self::default()
    }

    pub fn between(begin: impl Into<TimeSpec>, end: impl Into<TimeSpec>) -> Self {
        Self {
            begin: Some(begin.into()),
            end: Some(end.into()),
        }
    }

    pub fn starting(begin: impl Into<TimeSpec>) -> Self {
        Self {
            begin: Some(begin.into()),
            end: None,
        }
    }

    pub fn ending(end: impl Into<TimeSpec>) -> Self {
        Self {
            begin: None,
            end: Some(end.into()),
        }
    }
}

/// Builder for [`Session`].
pub struct SessionBuilder {
    source: Box<dyn DataSource>,
    store: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    date_begin: Option<TimeSpec>,
    date_end: Option<TimeSpec>,
    parallel_fetch: bool,
    registry: IndicatorRegistry,
}

impl SessionBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Default bounds used when a call supplies none.
    pub fn period(mut self, date_begin: impl Into<TimeSpec>, date_end: impl Into<TimeSpec>) -> Self {
        self.date_begin = Some(date_begin.into());
        self.date_end = Some(date_end.into());
        self
    }

    pub fn date_begin(mut self, date_begin: impl Into<TimeSpec>) -> Self {
        self.date_begin = Some(date_begin.into());
        self
    }

    pub fn date_end(mut self, date_end: impl Into<TimeSpec>) -> Self {
        self.date_end = Some(date_end.into());
        self
    }

    pub fn parallel_fetch(mut self, parallel: bool) -> Self {
        self.parallel_fetch = parallel;
        self
    }

    /// Add or replace an indicator module.
    pub fn register(mut self, module: Box<dyn IndicatorModule>) -> Self {
        self.registry.register(module);
        self
    }

    /// Bind the source (calling its `init` once) and normalize the default bounds.
    pub fn build(mut self) -> Result<Session> {
        if self.source.name().trim().is_empty() {
            return Err(BarlabError::InvalidConstructorArgument(
                "data source must have a non-empty name".into(),
            ));
        }
        let date_begin = self.date_begin.as_ref().map(|t| t.normalize(false)).transpose()?;
        let date_end = self.date_end.as_ref().map(|t| t.normalize(true)).transpose()?;
        if let (Some(b), Some(e)) = (date_begin, date_end) {
            TimeRange::new(b, e)?;
        }

        self.source.init()?;
        debug!(source = self.source.name(), "session bound to source");

        Ok(Session {
            cache: DayCache::new(self.source, self.store, self.clock),
            registry: self.registry,
            date_begin,
            date_end,
            parallel_fetch: self.parallel_fetch,
        })
    }
}

/// Entry point for OHLCV and indicator requests.
pub struct Session {
    cache: DayCache,
    registry: IndicatorRegistry,
    date_begin: Option<Timestamp>,
    date_end: Option<Timestamp>,
    parallel_fetch: bool,
}

impl Session {
    pub fn builder(source: impl DataSource + 'static, store: Arc<dyn BlobStore>) -> SessionBuilder {
        SessionBuilder {
            source: Box::new(source),
            store,
            clock: Arc::new(SystemClock),
            date_begin: None,
            date_end: None,
            parallel_fetch: false,
            registry: IndicatorRegistry::standard(),
        }
    }

    /// Session without default bounds, using the system clock.
    pub fn new(source: impl DataSource + 'static, store: Arc<dyn BlobStore>) -> Result<Self> {
        Self::builder(source, store).build()
    }

    pub fn source_name(&self) -> &str {
        self.cache.source().name()
    }

    pub fn registry(&self) -> &IndicatorRegistry {
        &self.registry
    }

    /// Normalized default bounds.
    pub fn default_bounds(&self) -> (Option<Timestamp>, Option<Timestamp>) {
        (self.date_begin, self.date_end)
    }

    /// Resolve per-call bounds against the session defaults.
    ///
    /// A per-call bound outside the session's own period is `OutOfPeriod`.
    pub fn resolve(&self, bounds: &Bounds) -> Result<(Option<Timestamp>, Option<Timestamp>)> {
        let begin = match &bounds.begin {
            Some(spec) => Some(spec.normalize(false)?),
            None => self.date_begin,
        };
        let end = match &bounds.end {
            Some(spec) => Some(spec.normalize(true)?),
            None => self.date_end,
        };

        if let (Some(b), Some(e)) = (begin, end) {
            TimeRange::new(b, e)?;
            let below = self.date_begin.is_some_and(|db| b < db);
            let above = self.date_end.is_some_and(|de| e > de);
            if below || above {
                return Err(BarlabError::OutOfPeriod {
                    begin: b.to_string(),
                    end: e.to_string(),
                    available: format!(
                        "{} .. {}",
                        self.date_begin.unwrap_or(Timestamp::MIN),
                        self.date_end.unwrap_or(Timestamp::MAX)
                    ),
                });
            }
        }
        Ok((begin, end))
    }

    fn request(&self, symbol: &str, timeframe: Timeframe, bounds: &Bounds) -> Result<SeriesRequest> {
        let (begin, end) = self.resolve(bounds)?;
        Ok(SeriesRequest::new(symbol, timeframe, begin, end))
    }

    fn assembler(&self) -> SeriesAssembler<'_> {
        SeriesAssembler::new(&self.cache).parallel(self.parallel_fetch)
    }

    /// OHLCV series for the resolved range.
    pub fn ohlcv(&self, symbol: &str, timeframe: Timeframe, bounds: &Bounds) -> Result<IndicatorData> {
        let request = self.request(symbol, timeframe, bounds)?;
        SeriesSource::ohlcv(self, &request)
    }

    /// OHLCV plus gap days and cache statistics.
    pub fn ohlcv_report(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        bounds: &Bounds,
    ) -> Result<AssemblyReport> {
        let request = self.request(symbol, timeframe, bounds)?;
        self.assembler()
            .assemble_report(&request.symbol, request.timeframe, request.begin, request.end)
    }

    /// Run a registered indicator by name.
    pub fn indicator(
        &self,
        name: &str,
        symbol: &str,
        timeframe: Timeframe,
        bounds: &Bounds,
        params: &IndicatorParams,
    ) -> Result<IndicatorData> {
        let module = self.registry.get(name)?;
        let request = self.request(symbol, timeframe, bounds)?;
        debug!(indicator = module.name(), symbol, %timeframe, "computing indicator");
        module.compute(self, &request, params)
    }

    pub fn sma(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        bounds: &Bounds,
        period: usize,
        value: &str,
    ) -> Result<IndicatorData> {
        let params = IndicatorParams::new().with("period", period).with("value", value);
        self.indicator("SMA", symbol, timeframe, bounds, &params)
    }

    pub fn ema(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        bounds: &Bounds,
        period: usize,
        value: &str,
    ) -> Result<IndicatorData> {
        let params = IndicatorParams::new().with("period", period).with("value", value);
        self.indicator("EMA", symbol, timeframe, bounds, &params)
    }

    pub fn bollinger_bands(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        bounds: &Bounds,
        period: usize,
        deviation: f64,
    ) -> Result<IndicatorData> {
        let params = IndicatorParams::new()
            .with("period", period)
            .with("deviation", deviation);
        self.indicator("BollingerBands", symbol, timeframe, bounds, &params)
    }

    pub fn atr(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        bounds: &Bounds,
        period: usize,
    ) -> Result<IndicatorData> {
        let params = IndicatorParams::new().with("period", period);
        self.indicator("ATR", symbol, timeframe, bounds, &params)
    }

    pub fn adx(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        bounds: &Bounds,
        period: usize,
        smooth: usize,
    ) -> Result<IndicatorData> {
        let params = IndicatorParams::new()
            .with("period", period)
            .with("smooth", smooth);
        self.indicator("ADX", symbol, timeframe, bounds, &params)
    }
}

impl SeriesSource for Session {
    fn ohlcv(&self, request: &SeriesRequest) -> Result<IndicatorData> {
        self.assembler()
            .assemble(&request.symbol, request.timeframe, request.begin, request.end)
    }
}
