//! Bar durations and boundary alignment.
//!
//! Every timeframe divides a day evenly, so bar boundaries computed as
//! multiples of the duration since the epoch always fall on day boundaries
//! too. That is what makes day-granular caching line up with bar edges.

use super::timestamp::{Timestamp, MS_PER_DAY, MS_PER_HOUR, MS_PER_MINUTE};
use crate::error::BarlabError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fixed span covered by one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Timeframe {
    M1,
    M3,
    M5,
    M15,
    M30,
    H1,
    H2,
    H4,
    H6,
    H8,
    H12,
    D1,
}

impl Timeframe {
    /// Duration in milliseconds. Always positive.
    pub const fn duration_ms(self) -> i64 {
        match self {
            Timeframe::M1 => MS_PER_MINUTE,
            Timeframe::M3 => 3 * MS_PER_MINUTE,
            Timeframe::M5 => 5 * MS_PER_MINUTE,
            Timeframe::M15 => 15 * MS_PER_MINUTE,
            Timeframe::M30 => 30 * MS_PER_MINUTE,
            Timeframe::H1 => MS_PER_HOUR,
            Timeframe::H2 => 2 * MS_PER_HOUR,
            Timeframe::H4 => 4 * MS_PER_HOUR,
            Timeframe::H6 => 6 * MS_PER_HOUR,
            Timeframe::H8 => 8 * MS_PER_HOUR,
            Timeframe::H12 => 12 * MS_PER_HOUR,
            Timeframe::D1 => MS_PER_DAY,
        }
    }

    pub fn duration(self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.duration_ms())
    }

    /// Floor `t` to the start of the bar containing it.
    pub fn begin_of_tf(self, t: Timestamp) -> Timestamp {
        let d = self.duration_ms();
        Timestamp::from_millis(t.millis().div_euclid(d) * d)
    }

    /// Last millisecond of the bar containing `t`.
    pub fn end_of_tf(self, t: Timestamp) -> Timestamp {
        self.begin_of_tf(t)
            .saturating_add_millis(self.duration_ms() - 1)
    }

    /// True when `t` sits exactly on a bar boundary.
    pub fn is_aligned(self, t: Timestamp) -> bool {
        t.millis().rem_euclid(self.duration_ms()) == 0
    }

    /// Number of bars in one calendar day.
    pub const fn bars_per_day(self) -> usize {
        (MS_PER_DAY / self.duration_ms()) as usize
    }

    pub const fn label(self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M3 => "3m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H2 => "2h",
            Timeframe::H4 => "4h",
            Timeframe::H6 => "6h",
            Timeframe::H8 => "8h",
            Timeframe::H12 => "12h",
            Timeframe::D1 => "1d",
        }
    }

    pub fn all() -> &'static [Timeframe] {
        &[
            Timeframe::M1,
            Timeframe::M3,
            Timeframe::M5,
            Timeframe::M15,
            Timeframe::M30,
            Timeframe::H1,
            Timeframe::H2,
            Timeframe::H4,
            Timeframe::H6,
            Timeframe::H8,
            Timeframe::H12,
            Timeframe::D1,
        ]
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Timeframe {
    type Err = BarlabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Timeframe::all()
            .iter()
            .copied()
            .find(|tf| tf.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| BarlabError::InvalidParameter {
                name: "timeframe".into(),
                reason: format!("unknown timeframe '{s}'"),
            })
    }
}

impl TryFrom<String> for Timeframe {
    type Error = BarlabError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Timeframe> for String {
    fn from(tf: Timeframe) -> Self {
        tf.label().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn every_timeframe_divides_a_day() {
        for tf in Timeframe::all() {
            assert!(tf.duration_ms() > 0);
            assert_eq!(MS_PER_DAY % tf.duration_ms(), 0, "{tf} does not divide a day");
        }
    }

    #[test]
    fn begin_of_tf_floors() {
        let day = NaiveDate::from_ymd_opt(2022, 9, 5).unwrap();
        let t = Timestamp::end_of_day(day);
        assert_eq!(
            Timeframe::M5.begin_of_tf(t).to_string(),
            "2022-09-05T23:55:00.000"
        );
        assert_eq!(
            Timeframe::H4.begin_of_tf(t).to_string(),
            "2022-09-05T20:00:00.000"
        );
        assert_eq!(Timeframe::D1.begin_of_tf(t), Timestamp::start_of_day(day));
    }

    #[test]
    fn aligned_value_is_fixed_point() {
        let t = Timestamp::from_millis(1_661_990_400_000);
        for tf in Timeframe::all() {
            assert_eq!(tf.begin_of_tf(t), t);
            assert!(tf.is_aligned(t));
        }
    }

    #[test]
    fn end_of_tf_is_last_millisecond() {
        let t = Timestamp::from_millis(1_661_990_400_000 + 7 * MS_PER_MINUTE);
        let end = Timeframe::M5.end_of_tf(t);
        assert_eq!(end.millis(), 1_661_990_400_000 + 10 * MS_PER_MINUTE - 1);
    }

    #[test]
    fn parse_and_display() {
        assert_eq!("5m".parse::<Timeframe>().unwrap(), Timeframe::M5);
        assert_eq!("1D".parse::<Timeframe>().unwrap(), Timeframe::D1);
        assert_eq!(Timeframe::H12.to_string(), "12h");
        assert!("7m".parse::<Timeframe>().is_err());
    }

    #[test]
    fn bars_per_day() {
        assert_eq!(Timeframe::M5.bars_per_day(), 288);
        assert_eq!(Timeframe::D1.bars_per_day(), 1);
    }

    #[test]
    fn serde_as_label() {
        let json = serde_json::to_string(&Timeframe::M15).unwrap();
        assert_eq!(json, "\"15m\"");
        let tf: Timeframe = serde_json::from_str("\"1h\"").unwrap();
        assert_eq!(tf, Timeframe::H1);
    }
}
