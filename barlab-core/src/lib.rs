//! Barlab Core: historical OHLCV retrieval and indicators.
//!
//! This crate contains:
//! - Time specs, timeframes, and boundary alignment
//! - A day-granular bar cache over pluggable blob stores and data sources
//! - Series assembly across calendar days, with gap and availability handling
//! - Calculator primitives and named indicator modules (SMA, EMA, Bollinger, ATR, ADX)
//! - A session surface and TOML configuration

pub mod calculator;
pub mod config;
pub mod data;
pub mod error;
pub mod indicators;
pub mod series;
pub mod session;
pub mod time;

pub use config::SessionConfig;
pub use error::{BarlabError, Result};
pub use indicators::{IndicatorParams, IndicatorRegistry};
pub use series::IndicatorData;
pub use session::{Bounds, Session};
pub use time::{TimeSpec, Timeframe, Timestamp};
