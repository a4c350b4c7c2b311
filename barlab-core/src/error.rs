//! Error taxonomy shared by every stage of the pipeline.
//!
//! Each variant is a distinct condition callers are expected to branch on.
//! Messages are for humans; matching should be done on the variant.

use chrono::NaiveDate;
use thiserror::Error;

/// Every failure the library can report.
#[derive(Debug, Error)]
pub enum BarlabError {
    #[error("invalid constructor argument: {0}")]
    InvalidConstructorArgument(String),

    #[error("No begin_time set")]
    MissingBeginTime,

    #[error("No end_time set")]
    MissingEndTime,

    #[error("invalid time spec: {0}")]
    InvalidTimeSpec(String),

    #[error("invalid range: begin {begin} is after end {end}")]
    InvalidRange { begin: String, end: String },

    #[error("requested range {begin} .. {end} is outside the available period {available}")]
    OutOfPeriod {
        begin: String,
        end: String,
        available: String,
    },

    #[error("source data not found: {symbol} ({timeframe}){}", day_suffix(.day))]
    SourceDataNotFound {
        symbol: String,
        timeframe: String,
        day: Option<NaiveDate>,
    },

    #[error("insufficient data: {needed} values required, {available} available")]
    InsufficientData { needed: usize, available: usize },

    #[error("too little data for {indicator}: {reason}")]
    TooLittleData { indicator: String, reason: String },

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("invalid source data for {symbol} on {day}: {reason}")]
    InvalidSourceData {
        symbol: String,
        day: NaiveDate,
        reason: String,
    },

    #[error("series shape error: {0}")]
    SeriesShape(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("data source error: {0}")]
    Source(String),

    #[error("config error: {0}")]
    Config(String),
}

fn day_suffix(day: &Option<NaiveDate>) -> String {
    match day {
        Some(d) => format!(" on {d}"),
        None => String::new(),
    }
}

pub type Result<T, E = BarlabError> = std::result::Result<T, E>;
