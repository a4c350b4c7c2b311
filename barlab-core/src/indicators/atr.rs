//! Average True Range (Wilder).
//!
//! TR[t] = max(high-low, |high-prev_close|, |low-prev_close|); TR[0] is undefined.
//! First `atr` value at index `period`.

use super::{
    from_primitive, require_bars, window, IndicatorModule, IndicatorParams, SeriesRequest,
    SeriesSource,
};
use crate::calculator;
use crate::error::Result;
use crate::series::IndicatorData;

#[derive(Debug, Clone, Copy, Default)]
pub struct Atr;

impl IndicatorModule for Atr {
    fn name(&self) -> &'static str {
        "ATR"
    }

    fn signature(&self) -> &'static str {
        "period=14"
    }

    fn compute(
        &self,
        source: &dyn SeriesSource,
        request: &SeriesRequest,
        params: &IndicatorParams,
    ) -> Result<IndicatorData> {
        let period = params.int("period", 14)?;

        let ohlcv = source.ohlcv(request)?;
        let period = window(self.name(), "period", period, ohlcv.len())?;
        require_bars(self.name(), period + 1, ohlcv.len())?;

        let tr = calculator::true_range(
            ohlcv.require("high")?,
            ohlcv.require("low")?,
            ohlcv.require("close")?,
        );
        let atr = calculator::wilder_smooth(&tr, period).map_err(from_primitive(self.name()))?;

        IndicatorData::builder(self.name(), ohlcv.timeframe(), ohlcv.time().to_vec())
            .column("atr", atr)
            .build()
    }
}
