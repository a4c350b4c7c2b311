//! Property tests for time normalization, alignment and the numeric primitives.
//!
//! Uses proptest to verify:
//! 1. Date-only specs expand to day start/end; date-times ignore `is_end`
//! 2. `begin_of_tf(t) <= t < begin_of_tf(t) + duration` for every timeframe
//! 3. SMA equals the trailing arithmetic mean
//! 4. Bollinger band identities and NaN z-scores on flat windows

use barlab_core::calculator;
use barlab_core::data::RawDayBars;
use barlab_core::indicators::{
    BollingerBands, IndicatorModule, IndicatorParams, SeriesRequest, SeriesSource,
};
use barlab_core::time::{MS_PER_DAY, MS_PER_MINUTE};
use barlab_core::{IndicatorData, Result, TimeSpec, Timeframe, Timestamp};
use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

// ── Strategies ───────────────────────────────────────────────────────

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (0i64..20_000).prop_map(|d| {
        NaiveDate::from_ymd_opt(1990, 1, 1).unwrap() + Duration::days(d)
    })
}

fn arb_timeframe() -> impl Strategy<Value = Timeframe> {
    proptest::sample::select(Timeframe::all().to_vec())
}

fn arb_prices(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    proptest::collection::vec(0.01..1000.0_f64, 1..max_len)
}

struct Fixed(IndicatorData);

impl SeriesSource for Fixed {
    fn ohlcv(&self, _request: &SeriesRequest) -> Result<IndicatorData> {
        Ok(self.0.clone())
    }
}

fn series_from_closes(closes: &[f64]) -> IndicatorData {
    let mut bars = RawDayBars::empty();
    for (i, &c) in closes.iter().enumerate() {
        bars.push(
            Timestamp::from_millis(i as i64 * MS_PER_DAY),
            c,
            c + 1.0,
            c - 1.0,
            c,
            1.0,
        );
    }
    bars.into_series(Timeframe::D1).unwrap()
}

fn close_enough(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-11 * b.abs().max(1.0)
}

// ── 1. Normalization ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn date_only_shapes_expand_to_day_edges(date in arb_date()) {
        let start = Timestamp::start_of_day(date);
        let end = Timestamp::end_of_day(date);
        let compact: i64 = date.format("%Y%m%d").to_string().parse().unwrap();

        let shapes = [
            TimeSpec::from(date),
            TimeSpec::from(compact),
            TimeSpec::from(date.format("%Y%m%d").to_string()),
            TimeSpec::from(date.format("%Y-%m-%d").to_string()),
        ];
        for spec in &shapes {
            prop_assert_eq!(spec.normalize(false).unwrap(), start);
            prop_assert_eq!(spec.normalize(true).unwrap(), end);
        }
        prop_assert_eq!(end.millis() - start.millis(), MS_PER_DAY - 1);
    }

    #[test]
    fn date_times_ignore_is_end(date in arb_date(), minute in 0u32..1440) {
        let dt = date.and_hms_opt(minute / 60, minute % 60, 0).unwrap();
        let expected = Timestamp::from_naive(dt);
        for spec in [
            TimeSpec::from(dt),
            TimeSpec::from(dt.format("%Y-%m-%dT%H:%M").to_string()),
            TimeSpec::from(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            TimeSpec::from(expected),
        ] {
            prop_assert_eq!(spec.normalize(false).unwrap(), expected);
            prop_assert_eq!(spec.normalize(true).unwrap(), expected);
        }
    }
}

// ── 2. Alignment ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn begin_of_tf_brackets_instant(
        tf in arb_timeframe(),
        ms in -5_000_000_000_000i64..5_000_000_000_000,
    ) {
        let t = Timestamp::from_millis(ms);
        let b = tf.begin_of_tf(t);
        prop_assert!(b <= t);
        prop_assert!(t.millis() < b.millis() + tf.duration_ms());
        prop_assert!(tf.is_aligned(b));
        prop_assert_eq!(tf.begin_of_tf(b), b);
        prop_assert_eq!(tf.end_of_tf(t).millis(), b.millis() + tf.duration_ms() - 1);
    }

    #[test]
    fn bars_per_day_tiles_the_day(tf in arb_timeframe()) {
        prop_assert_eq!(tf.bars_per_day() as i64 * tf.duration_ms(), MS_PER_DAY);
        prop_assert!(tf.duration_ms() >= MS_PER_MINUTE);
    }
}

// ── 3. SMA ───────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn sma_is_trailing_mean(values in arb_prices(300), period in 1usize..40) {
        let out = calculator::sma(&values, period).unwrap();
        prop_assert_eq!(out.len(), values.len());
        for i in 0..values.len() {
            if i + 1 < period {
                prop_assert!(out[i].is_nan());
            } else {
                let window = &values[i + 1 - period..=i];
                let mean = window.iter().sum::<f64>() / period as f64;
                prop_assert!(close_enough(out[i], mean), "i={} sma={} mean={}", i, out[i], mean);
            }
        }
    }

    #[test]
    fn stddev_is_never_negative(values in arb_prices(200), period in 1usize..30) {
        let out = calculator::rolling_stddev(&values, period).unwrap();
        for v in out.iter().filter(|v| !v.is_nan()) {
            prop_assert!(*v >= 0.0);
        }
    }
}

// ── 4. Bollinger Bands ───────────────────────────────────────────────

proptest! {
    #[test]
    fn bollinger_identities(
        values in arb_prices(200),
        period in 1usize..30,
        deviation in 0.5..4.0_f64,
    ) {
        prop_assume!(period <= values.len());
        let source = Fixed(series_from_closes(&values));
        let request = SeriesRequest::new("P", Timeframe::D1, None, None);
        let params = IndicatorParams::new()
            .with("period", period)
            .with("deviation", deviation);
        let out = BollingerBands.compute(&source, &request, &params).unwrap();
        let sd = calculator::rolling_stddev(&values, period).unwrap();

        let mid = out.column("mid_line").unwrap();
        let up = out.column("up_line").unwrap();
        let down = out.column("down_line").unwrap();
        let z = out.column("z_score").unwrap();

        for i in period - 1..values.len() {
            let band = deviation * sd[i];
            prop_assert!((up[i] - mid[i] - band).abs() <= 1e-9 * mid[i].abs().max(1.0));
            prop_assert!((mid[i] - down[i] - band).abs() <= 1e-9 * mid[i].abs().max(1.0));
            if sd[i] == 0.0 {
                prop_assert!(z[i].is_nan());
            } else {
                let deviation_from_mid = values[i] - mid[i];
                prop_assert!((z[i] * sd[i] - deviation_from_mid).abs() <= 1e-9 * values[i].abs().max(1.0));
            }
        }
    }

    #[test]
    fn flat_series_has_nan_z_scores(level in 0.01..1000.0_f64, len in 2usize..50, period in 1usize..10) {
        prop_assume!(period <= len);
        let values = vec![level; len];
        let source = Fixed(series_from_closes(&values));
        let request = SeriesRequest::new("P", Timeframe::D1, None, None);
        let params = IndicatorParams::new().with("period", period);
        let out = BollingerBands.compute(&source, &request, &params).unwrap();
        let z = out.column("z_score").unwrap();
        prop_assert!(z.iter().all(|v| v.is_nan()));
    }
}
