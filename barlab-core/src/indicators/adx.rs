//! ADX: Average Directional Index (Wilder).
//!
//! Steps:
//! 1. +DM, -DM and TR from consecutive bars (undefined at index 0)
//! 2. Wilder-smooth +DM, -DM and TR over `period`
//! 3. +DI = 100 * smoothed(+DM) / smoothed(TR), -DI likewise
//! 4. DX = 100 * |+DI - -DI| / (+DI + -DI), 0 when the two are equal
//! 5. ADX = Wilder-smoothed DX over `smooth`
//!
//! `pdi`/`mdi` are first defined at index `period`, `adx` at `period + smooth - 1`.

use super::{
    from_primitive, require_bars, window, IndicatorModule, IndicatorParams, SeriesRequest,
    SeriesSource,
};
use crate::calculator;
use crate::error::Result;
use crate::series::IndicatorData;

#[derive(Debug, Clone, Copy, Default)]
pub struct Adx;

impl IndicatorModule for Adx {
    fn name(&self) -> &'static str {
        "ADX"
    }

    fn signature(&self) -> &'static str {
        "period=14, smooth=14"
    }

    fn compute(
        &self,
        source: &dyn SeriesSource,
        request: &SeriesRequest,
        params: &IndicatorParams,
    ) -> Result<IndicatorData> {
        let period = params.int("period", 14)?;
        let smooth = params.int("smooth", 14)?;

        let ohlcv = source.ohlcv(request)?;
        let n = ohlcv.len();
        let period = window(self.name(), "period", period, n)?;
        let smooth = window(self.name(), "smooth", smooth, n)?;
        require_bars(self.name(), period + smooth, n)?;

        let high = ohlcv.require("high")?;
        let low = ohlcv.require("low")?;
        let close = ohlcv.require("close")?;
        let primitive = from_primitive(self.name());

        let tr = calculator::true_range(high, low, close);
        let (plus_dm, minus_dm) = calculator::directional_movement(high, low);
        let smooth_tr = calculator::wilder_smooth(&tr, period).map_err(&primitive)?;
        let smooth_plus = calculator::wilder_smooth(&plus_dm, period).map_err(&primitive)?;
        let smooth_minus = calculator::wilder_smooth(&minus_dm, period).map_err(&primitive)?;

        let mut pdi = vec![f64::NAN; n];
        let mut mdi = vec![f64::NAN; n];
        let mut dx = vec![f64::NAN; n];
        for i in 0..n {
            let trs = smooth_tr[i];
            if trs.is_nan() || trs == 0.0 || smooth_plus[i].is_nan() || smooth_minus[i].is_nan() {
                continue;
            }
            let p = 100.0 * smooth_plus[i] / trs;
            let m = 100.0 * smooth_minus[i] / trs;
            pdi[i] = p;
            mdi[i] = m;
            dx[i] = if p == m { 0.0 } else { 100.0 * (p - m).abs() / (p + m) };
        }

        let adx = calculator::wilder_smooth(&dx, smooth).map_err(&primitive)?;

        IndicatorData::builder(self.name(), ohlcv.timeframe(), ohlcv.time().to_vec())
            .column("adx", adx)
            .column("pdi", pdi)
            .column("mdi", mdi)
            .build()
    }
}
