//! Exponential Moving Average.
//!
//! `alpha = 2 / (period + 1)`, seeded with the SMA of the first `period` values.
//! Output `ema_<value>`.

use super::{
    from_primitive, value_field, window, IndicatorModule, IndicatorParams, SeriesRequest,
    SeriesSource,
};
use crate::calculator;
use crate::error::Result;
use crate::series::IndicatorData;

#[derive(Debug, Clone, Copy, Default)]
pub struct Ema;

impl IndicatorModule for Ema {
    fn name(&self) -> &'static str {
        "EMA"
    }

    fn signature(&self) -> &'static str {
        "period=<required>, value=close"
    }

    fn compute(
        &self,
        source: &dyn SeriesSource,
        request: &SeriesRequest,
        params: &IndicatorParams,
    ) -> Result<IndicatorData> {
        let field = value_field(params)?;
        let period = params.required_int("period")?;

        let ohlcv = source.ohlcv(request)?;
        let period = window(self.name(), "period", period, ohlcv.len())?;
        let values = ohlcv.require(&field)?;

        let out = calculator::ema(values, period).map_err(from_primitive(self.name()))?;
        IndicatorData::builder(self.name(), ohlcv.timeframe(), ohlcv.time().to_vec())
            .column(format!("ema_{field}"), out)
            .build()
    }
}
