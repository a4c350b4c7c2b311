//! Bollinger Bands.
//!
//! - `mid_line`: SMA(value, period)
//! - `up_line`, `down_line`: mid_line +/- deviation * stddev(value, period)
//! - `z_score`: (value - mid_line) / stddev, NaN where stddev is zero or undefined
//!
//! Population stddev (divide by N).

use super::{
    from_primitive, value_field, window, IndicatorModule, IndicatorParams, SeriesRequest,
    SeriesSource,
};
use crate::calculator;
use crate::error::{BarlabError, Result};
use crate::series::IndicatorData;

#[derive(Debug, Clone, Copy, Default)]
pub struct BollingerBands;

impl IndicatorModule for BollingerBands {
    fn name(&self) -> &'static str {
        "BollingerBands"
    }

    fn signature(&self) -> &'static str {
        "period=20, deviation=2, value=close"
    }

    fn compute(
        &self,
        source: &dyn SeriesSource,
        request: &SeriesRequest,
        params: &IndicatorParams,
    ) -> Result<IndicatorData> {
        let field = value_field(params)?;
        let period = params.int("period", 20)?;
        let deviation = params.float("deviation", 2.0)?;
        if !deviation.is_finite() || deviation < 0.0 {
            return Err(BarlabError::InvalidParameter {
                name: "deviation".into(),
                reason: format!("must be a finite non-negative number, got {deviation}"),
            });
        }

        let ohlcv = source.ohlcv(request)?;
        let period = window(self.name(), "period", period, ohlcv.len())?;
        let values = ohlcv.require(&field)?;

        let mid = calculator::sma(values, period).map_err(from_primitive(self.name()))?;
        let sd = calculator::rolling_stddev(values, period).map_err(from_primitive(self.name()))?;

        let n = values.len();
        let mut up = vec![f64::NAN; n];
        let mut down = vec![f64::NAN; n];
        let mut z = vec![f64::NAN; n];
        for i in 0..n {
            if mid[i].is_nan() || sd[i].is_nan() {
                continue;
            }
            up[i] = mid[i] + deviation * sd[i];
            down[i] = mid[i] - deviation * sd[i];
            if sd[i] != 0.0 {
                z[i] = (values[i] - mid[i]) / sd[i];
            }
        }

        IndicatorData::builder(self.name(), ohlcv.timeframe(), ohlcv.time().to_vec())
            .column("mid_line", mid)
            .column("up_line", up)
            .column("down_line", down)
            .column("z_score", z)
            .build()
    }
}
