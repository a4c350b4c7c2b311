//! Parquet encoding of one cached day.
//!
//! Columns: `time` (i64 ms), `open`, `high`, `low`, `close`, `volume` (f64).
//! Decoding checks the column set and rejects nulls; the caller then checks
//! the day invariants with [`RawDayBars::validate`].

use super::provider::RawDayBars;
use crate::error::{BarlabError, Result};
use crate::time::Timestamp;
use polars::prelude::*;
use std::io::Cursor;

const VALUE_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

/// Serialize a day to Parquet bytes.
pub fn encode_day(bars: &RawDayBars) -> Result<Vec<u8>> {
    let times: Vec<i64> = bars.time.iter().map(|t| t.millis()).collect();

    let mut df = DataFrame::new(vec![
        Column::new("time".into(), times),
        Column::new("open".into(), bars.open.clone()),
        Column::new("high".into(), bars.high.clone()),
        Column::new("low".into(), bars.low.clone()),
        Column::new("close".into(), bars.close.clone()),
        Column::new("volume".into(), bars.volume.clone()),
    ])
    .map_err(|e| BarlabError::Cache(format!("dataframe creation: {e}")))?;

    let mut buf = Vec::new();
    ParquetWriter::new(&mut buf)
        .finish(&mut df)
        .map_err(|e| BarlabError::Cache(format!("write parquet: {e}")))?;
    Ok(buf)
}

/// Parse Parquet bytes back into a day.
pub fn decode_day(bytes: &[u8]) -> Result<RawDayBars> {
    let df = ParquetReader::new(Cursor::new(bytes))
        .finish()
        .map_err(|e| BarlabError::Cache(format!("read parquet: {e}")))?;

    let map_err = |e: PolarsError| BarlabError::Cache(format!("column read: {e}"));

    let time_ca = df
        .column("time")
        .map_err(map_err)?
        .i64()
        .map_err(|e| BarlabError::Cache(format!("time column type: {e}")))?;
    if time_ca.null_count() > 0 {
        return Err(BarlabError::Cache("null in column 'time'".into()));
    }

    let n = df.height();
    let mut time = Vec::with_capacity(n);
    for i in 0..n {
        let ms = time_ca
            .get(i)
            .ok_or_else(|| BarlabError::Cache(format!("null time at row {i}")))?;
        time.push(Timestamp::from_millis(ms));
    }

    let mut values: Vec<Vec<f64>> = Vec::with_capacity(VALUE_COLUMNS.len());
    for name in VALUE_COLUMNS {
        let ca = df
            .column(name)
            .map_err(map_err)?
            .f64()
            .map_err(|e| BarlabError::Cache(format!("{name} column type: {e}")))?;
        if ca.null_count() > 0 {
            return Err(BarlabError::Cache(format!("null in column '{name}'")));
        }
        let mut col = Vec::with_capacity(n);
        for i in 0..n {
            col.push(ca.get(i).unwrap_or(f64::NAN));
        }
        values.push(col);
    }

    let mut values = values.into_iter();
    let mut next = || values.next().unwrap_or_default();
    Ok(RawDayBars {
        time,
        open: next(),
        high: next(),
        low: next(),
        close: next(),
        volume: next(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::MS_PER_MINUTE;

    fn sample() -> RawDayBars {
        let mut bars = RawDayBars::empty();
        for i in 0..4 {
            let p = 1234.5678 + i as f64 * 0.125;
            bars.push(
                Timestamp::from_millis(1_656_633_600_000 + i * 5 * MS_PER_MINUTE),
                p,
                p + 0.5,
                p - 0.5,
                p + 0.1,
                1e6 / 3.0,
            );
        }
        bars
    }

    #[test]
    fn parquet_preserves_bits() {
        let bars = sample();
        let decoded = decode_day(&encode_day(&bars).unwrap()).unwrap();
        assert_eq!(decoded, bars);
        for (a, b) in decoded.volume.iter().zip(&bars.volume) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn empty_day_encodes() {
        let decoded = decode_day(&encode_day(&RawDayBars::empty()).unwrap()).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(matches!(
            decode_day(b"definitely not parquet"),
            Err(BarlabError::Cache(_))
        ));
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let bytes = encode_day(&sample()).unwrap();
        assert!(decode_day(&bytes[..bytes.len() / 2]).is_err());
    }
}
