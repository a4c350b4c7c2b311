//! Numeric primitives shared by the indicators.
//!
//! Every function takes plain slices and returns a new vector of the same
//! length, with NaN where there is not enough history. NaN inputs poison the
//! windows that contain them.

use crate::error::{BarlabError, Result};

/// Running sum with Neumaier compensation, so long add/remove sequences do
/// not drift away from the exact window sum.
#[derive(Debug, Default, Clone, Copy)]
struct RunningSum {
    sum: f64,
    comp: f64,
}

impl RunningSum {
    fn add(&mut self, v: f64) {
        let t = self.sum + v;
        if self.sum.abs() >= v.abs() {
            self.comp += (self.sum - t) + v;
        } else {
            self.comp += (v - t) + self.sum;
        }
        self.sum = t;
    }

    fn value(&self) -> f64 {
        self.sum + self.comp
    }
}

fn check_window(len: usize, period: usize) -> Result<()> {
    if period == 0 {
        return Err(BarlabError::InvalidParameter {
            name: "period".into(),
            reason: "must be at least 1".into(),
        });
    }
    if len == 0 {
        return Err(BarlabError::InsufficientData {
            needed: 1,
            available: 0,
        });
    }
    Ok(())
}

/// Simple moving average. `out[i]` is NaN for `i < period - 1`.
pub fn sma(values: &[f64], period: usize) -> Result<Vec<f64>> {
    check_window(values.len(), period)?;
    let n = values.len();
    let mut out = vec![f64::NAN; n];

    let mut sum = RunningSum::default();
    let mut nan_in_window = 0usize;
    for i in 0..n {
        let entering = values[i];
        if entering.is_nan() {
            nan_in_window += 1;
        } else {
            sum.add(entering);
        }
        if i >= period {
            let leaving = values[i - period];
            if leaving.is_nan() {
                nan_in_window -= 1;
            } else {
                sum.add(-leaving);
            }
        }
        if i + 1 >= period && nan_in_window == 0 {
            out[i] = sum.value() / period as f64;
        }
    }
    Ok(out)
}

/// Population standard deviation (denominator `period`) over the trailing window.
///
/// One pass with running compensated sums of `v - shift` and its square, where
/// `shift` is the first non-NaN input. A window of identical values yields
/// exactly 0.
pub fn rolling_stddev(values: &[f64], period: usize) -> Result<Vec<f64>> {
    check_window(values.len(), period)?;
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    let Some(shift) = values.iter().copied().find(|v| !v.is_nan()) else {
        return Ok(out);
    };

    let mut sum = RunningSum::default();
    let mut sum_sq = RunningSum::default();
    let mut nan_in_window = 0usize;
    // Length of the run of equal values ending at i.
    let mut run = 0usize;
    for i in 0..n {
        let entering = values[i];
        if entering.is_nan() {
            nan_in_window += 1;
        } else {
            let d = entering - shift;
            sum.add(d);
            sum_sq.add(d * d);
        }
        if i >= period {
            let leaving = values[i - period];
            if leaving.is_nan() {
                nan_in_window -= 1;
            } else {
                let d = leaving - shift;
                sum.add(-d);
                sum_sq.add(-(d * d));
            }
        }
        run = if i > 0 && entering == values[i - 1] { run + 1 } else { 1 };

        if i + 1 < period || nan_in_window > 0 {
            continue;
        }
        if run >= period {
            out[i] = 0.0;
            continue;
        }
        let mean = sum.value() / period as f64;
        let variance = (sum_sq.value() / period as f64 - mean * mean).max(0.0);
        out[i] = variance.sqrt();
    }
    Ok(out)
}

/// First index where `period` consecutive non-NaN values end, if any.
fn first_full_window(values: &[f64], period: usize) -> Option<usize> {
    let mut streak = 0;
    for (i, v) in values.iter().enumerate() {
        if v.is_nan() {
            streak = 0;
        } else {
            streak += 1;
            if streak == period {
                return Some(i);
            }
        }
    }
    None
}

/// Wilder smoothing: seeded with the mean of the first `period` valid values,
/// then `out[i] = out[i-1] + (v[i] - out[i-1]) / period`.
///
/// Leading NaNs are skipped when looking for the seed window. A NaN after the
/// seed poisons everything that follows.
pub fn wilder_smooth(values: &[f64], period: usize) -> Result<Vec<f64>> {
    check_window(values.len(), period)?;
    if values.len() < period {
        return Err(BarlabError::InsufficientData {
            needed: period,
            available: values.len(),
        });
    }
    let n = values.len();
    let mut out = vec![f64::NAN; n];

    let Some(seed_end) = first_full_window(values, period) else {
        return Ok(out);
    };
    let seed = values[seed_end + 1 - period..=seed_end].iter().sum::<f64>() / period as f64;
    out[seed_end] = seed;

    let mut prev = seed;
    for i in seed_end + 1..n {
        if values[i].is_nan() {
            break;
        }
        prev += (values[i] - prev) / period as f64;
        out[i] = prev;
    }
    Ok(out)
}

/// Exponential moving average, `alpha = 2 / (period + 1)`, seeded with the SMA
/// of the first `period` values.
pub fn ema(values: &[f64], period: usize) -> Result<Vec<f64>> {
    check_window(values.len(), period)?;
    if values.len() < period {
        return Err(BarlabError::InsufficientData {
            needed: period,
            available: values.len(),
        });
    }
    let n = values.len();
    let mut out = vec![f64::NAN; n];

    let Some(seed_end) = first_full_window(values, period) else {
        return Ok(out);
    };
    let seed = values[seed_end + 1 - period..=seed_end].iter().sum::<f64>() / period as f64;
    out[seed_end] = seed;

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev = seed;
    for i in seed_end + 1..n {
        if values[i].is_nan() {
            break;
        }
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        out[i] = prev;
    }
    Ok(out)
}

/// True range. Index 0 has no previous close and is NaN.
pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    let n = high.len().min(low.len()).min(close.len());
    let mut tr = vec![f64::NAN; n];
    for i in 1..n {
        let (h, l, pc) = (high[i], low[i], close[i - 1]);
        if h.is_nan() || l.is_nan() || pc.is_nan() {
            continue;
        }
        tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
    }
    tr
}

/// Directional movement `(+DM, -DM)`. Index 0 is NaN.
pub fn directional_movement(high: &[f64], low: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let n = high.len().min(low.len());
    let mut plus = vec![f64::NAN; n];
    let mut minus = vec![f64::NAN; n];
    for i in 1..n {
        let up = high[i] - high[i - 1];
        let down = low[i - 1] - low[i];
        if up.is_nan() || down.is_nan() {
            continue;
        }
        plus[i] = if up > down && up > 0.0 { up } else { 0.0 };
        minus[i] = if down > up && down > 0.0 { down } else { 0.0 };
    }
    (plus, minus)
}

#[cfg(test)]
pub(crate) fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub(crate) const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_basic() {
        let out = sma(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0], 5).unwrap();
        assert!(out[..4].iter().all(|v| v.is_nan()));
        assert_approx(out[4], 12.0, DEFAULT_EPSILON);
        assert_approx(out[5], 13.0, DEFAULT_EPSILON);
        assert_approx(out[6], 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_period_one_is_identity() {
        let out = sma(&[100.0, 200.0, 300.0], 1).unwrap();
        assert_eq!(out, vec![100.0, 200.0, 300.0]);
    }

    #[test]
    fn sma_nan_poisons_window_only() {
        let out = sma(&[10.0, 11.0, f64::NAN, 13.0, 14.0, 15.0], 3).unwrap();
        assert!(out[2].is_nan() && out[3].is_nan() && out[4].is_nan());
        assert_approx(out[5], 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_short_input_is_all_nan() {
        let out = sma(&[10.0, 11.0], 5).unwrap();
        assert!(out.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn empty_and_zero_period_fail() {
        assert!(matches!(
            sma(&[], 3),
            Err(BarlabError::InsufficientData { needed: 1, available: 0 })
        ));
        assert!(matches!(
            sma(&[1.0], 0),
            Err(BarlabError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn stddev_is_population() {
        // mean 5, squared deviations 9,1,1,9 → variance 5
        let out = rolling_stddev(&[2.0, 4.0, 6.0, 8.0], 4).unwrap();
        assert_approx(out[3], 5.0_f64.sqrt(), DEFAULT_EPSILON);
    }

    #[test]
    fn stddev_of_constant_window_is_exact_zero() {
        let out = rolling_stddev(&[0.1, 0.1, 0.1, 0.1, 0.2], 3).unwrap();
        assert_eq!(out[2], 0.0);
        assert_eq!(out[3], 0.0);
        assert!(out[4] > 0.0);
    }

    #[test]
    fn stddev_matches_two_pass_reference() {
        let values: Vec<f64> = (0..500)
            .map(|i| 1000.0 + (i as f64 * 0.37).sin() * 3.0 + i as f64 * 0.05)
            .collect();
        let period = 20;
        let out = rolling_stddev(&values, period).unwrap();
        for i in period - 1..values.len() {
            let window = &values[i + 1 - period..=i];
            let mean = window.iter().sum::<f64>() / period as f64;
            let var = window.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / period as f64;
            assert_approx(out[i], var.sqrt(), 1e-9);
        }
    }

    #[test]
    fn stddev_nan_poisons_window_only() {
        let out = rolling_stddev(&[1.0, f64::NAN, 3.0, 5.0, 7.0], 2).unwrap();
        assert!(out[0].is_nan());
        assert!(out[1].is_nan());
        assert!(out[2].is_nan());
        assert_approx(out[3], 1.0, DEFAULT_EPSILON);
        assert_approx(out[4], 1.0, DEFAULT_EPSILON);
    }

    #[test]
    fn wilder_seed_and_recurrence() {
        let out = wilder_smooth(&[f64::NAN, 10.0, 8.0, 9.0, 12.0], 3).unwrap();
        assert!(out[0].is_nan() && out[1].is_nan() && out[2].is_nan());
        assert_approx(out[3], 9.0, DEFAULT_EPSILON);
        assert_approx(out[4], 9.0 + (12.0 - 9.0) / 3.0, DEFAULT_EPSILON);
    }

    #[test]
    fn wilder_needs_period_values() {
        assert!(matches!(
            wilder_smooth(&[1.0, 2.0], 3),
            Err(BarlabError::InsufficientData { needed: 3, available: 2 })
        ));
    }

    #[test]
    fn ema_recurrence() {
        let out = ema(&[1.0, 2.0, 3.0, 4.0], 3).unwrap();
        assert_approx(out[2], 2.0, DEFAULT_EPSILON);
        assert_approx(out[3], 0.5 * 4.0 + 0.5 * 2.0, DEFAULT_EPSILON);
    }

    #[test]
    fn true_range_uses_previous_close() {
        let high = [105.0, 108.0, 115.0];
        let low = [95.0, 100.0, 108.0];
        let close = [102.0, 100.0, 112.0];
        let tr = true_range(&high, &low, &close);
        assert!(tr[0].is_nan());
        assert_approx(tr[1], 8.0, DEFAULT_EPSILON);
        assert_approx(tr[2], 15.0, DEFAULT_EPSILON);
    }

    #[test]
    fn directional_movement_picks_dominant_side() {
        let (plus, minus) = directional_movement(&[10.0, 12.0, 11.0], &[8.0, 9.0, 6.0]);
        assert_eq!(plus[1], 2.0);
        assert_eq!(minus[1], 0.0);
        assert_eq!(plus[2], 0.0);
        assert_eq!(minus[2], 3.0);
    }
}
