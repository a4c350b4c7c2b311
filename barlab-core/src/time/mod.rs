//! Time handling: canonical instants, caller time specs, timeframes, ranges.

pub mod range;
pub mod spec;
pub mod timeframe;
pub mod timestamp;

pub use range::TimeRange;
pub use spec::{normalize, TimeSpec};
pub use timeframe::Timeframe;
pub use timestamp::{Timestamp, MS_PER_DAY, MS_PER_HOUR, MS_PER_MINUTE, MS_PER_SECOND};
