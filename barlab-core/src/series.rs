//! Columnar series container shared by every pipeline stage.
//!
//! An `IndicatorData` is a `time` axis plus named `f64` columns of the same
//! length. It is built once and never mutated; transforms produce new
//! containers.

use crate::error::{BarlabError, Result};
use crate::time::{Timeframe, Timestamp};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

/// OHLCV column names, in canonical order.
pub const OHLCV_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

/// Immutable bundle of equal-length columns keyed by name.
#[derive(Debug, Clone, Serialize)]
pub struct IndicatorData {
    name: String,
    timeframe: Timeframe,
    time: Vec<Timestamp>,
    columns: BTreeMap<String, Vec<f64>>,
}

impl IndicatorData {
    /// Start building a container over `time`.
    pub fn builder(
        name: impl Into<String>,
        timeframe: Timeframe,
        time: Vec<Timestamp>,
    ) -> IndicatorDataBuilder {
        IndicatorDataBuilder {
            name: name.into(),
            timeframe,
            time,
            columns: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn time(&self) -> &[Timestamp] {
        &self.time
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn first_time(&self) -> Option<Timestamp> {
        self.time.first().copied()
    }

    pub fn last_time(&self) -> Option<Timestamp> {
        self.time.last().copied()
    }

    /// Named column, if present.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(|v| v.as_slice())
    }

    /// Named column or `InvalidParameter` naming the missing column.
    pub fn require(&self, name: &str) -> Result<&[f64]> {
        self.column(name).ok_or_else(|| BarlabError::InvalidParameter {
            name: name.to_string(),
            reason: format!("series '{}' has no column '{name}'", self.name),
        })
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    pub fn open(&self) -> Option<&[f64]> {
        self.column("open")
    }

    pub fn high(&self) -> Option<&[f64]> {
        self.column("high")
    }

    pub fn low(&self) -> Option<&[f64]> {
        self.column("low")
    }

    pub fn close(&self) -> Option<&[f64]> {
        self.column("close")
    }

    pub fn volume(&self) -> Option<&[f64]> {
        self.column("volume")
    }

    /// New container holding only rows with `begin <= time <= end`.
    ///
    /// `time` is strictly increasing, so the kept rows are one contiguous run.
    pub fn slice_time(&self, begin: Timestamp, end: Timestamp) -> IndicatorData {
        let lo = self.time.partition_point(|t| *t < begin);
        let hi = self.time.partition_point(|t| *t <= end).max(lo);
        IndicatorData {
            name: self.name.clone(),
            timeframe: self.timeframe,
            time: self.time[lo..hi].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|(k, v)| (k.clone(), v[lo..hi].to_vec()))
                .collect(),
        }
    }

    /// Write as CSV: `time` first, then columns in name order.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        let names: Vec<&str> = self.column_names().collect();

        let mut header = Vec::with_capacity(names.len() + 1);
        header.push("time");
        header.extend(names.iter().copied());
        wtr.write_record(&header).map_err(csv_err)?;

        for (i, t) in self.time.iter().enumerate() {
            let mut row = Vec::with_capacity(names.len() + 1);
            row.push(t.to_string());
            for name in &names {
                row.push(format_value(self.columns[*name][i]));
            }
            wtr.write_record(&row).map_err(csv_err)?;
        }

        wtr.flush()
            .map_err(|e| BarlabError::Cache(format!("csv flush: {e}")))
    }
}

fn format_value(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else {
        v.to_string()
    }
}

fn csv_err(e: csv::Error) -> BarlabError {
    BarlabError::Cache(format!("csv write: {e}"))
}

/// Column values compare bit-for-bit, so NaN warmup rows are equal to themselves.
impl PartialEq for IndicatorData {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.timeframe == other.timeframe
            && self.time == other.time
            && self.columns.len() == other.columns.len()
            && self.columns.iter().zip(&other.columns).all(|((ka, va), (kb, vb))| {
                ka == kb
                    && va.len() == vb.len()
                    && va.iter().zip(vb).all(|(a, b)| a.to_bits() == b.to_bits())
            })
    }
}

/// Accumulates columns and checks shape on `build`.
#[derive(Debug)]
pub struct IndicatorDataBuilder {
    name: String,
    timeframe: Timeframe,
    time: Vec<Timestamp>,
    columns: BTreeMap<String, Vec<f64>>,
}

impl IndicatorDataBuilder {
    pub fn column(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.columns.insert(name.into(), values);
        self
    }

    /// Validate lengths and time ordering, then freeze.
    pub fn build(self) -> Result<IndicatorData> {
        let n = self.time.len();
        for (name, values) in &self.columns {
            if values.len() != n {
                return Err(BarlabError::SeriesShape(format!(
                    "column '{name}' has {} values, time has {n}",
                    values.len()
                )));
            }
        }
        if let Some(i) = self.time.windows(2).position(|w| w[0] >= w[1]) {
            return Err(BarlabError::SeriesShape(format!(
                "time is not strictly increasing at row {}",
                i + 1
            )));
        }
        Ok(IndicatorData {
            name: self.name,
            timeframe: self.timeframe,
            time: self.time,
            columns: self.columns,
        })
    }
}
