//! Binance public klines connector.
//!
//! Symbols follow the prefix convention `ethusdt` (spot), `um/ethusdt`
//! (USD-M futures) and `cm/ethusd_perp` (COIN-M futures). One calendar day is
//! fetched per call, paginated by `startTime`. Transport failures are retried
//! with exponential backoff; bans and runs of failures trip the circuit breaker.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataSource, DayFetch, RawDayBars};
use crate::error::{BarlabError, Result};
use crate::time::{Timeframe, Timestamp};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Binance error code for an unknown symbol.
const INVALID_SYMBOL: i64 = -1121;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Market {
    Spot,
    UsdM,
    CoinM,
}

impl Market {
    /// Split a prefixed symbol into market and exchange symbol (upper case).
    pub fn split(symbol: &str) -> (Market, String) {
        let (market, raw) = match symbol.split_once('/') {
            Some(("um", rest)) => (Market::UsdM, rest),
            Some(("cm", rest)) => (Market::CoinM, rest),
            _ => (Market::Spot, symbol),
        };
        (market, raw.to_ascii_uppercase())
    }

    pub fn klines_url(self) -> &'static str {
        match self {
            Market::Spot => "https://api.binance.com/api/v3/klines",
            Market::UsdM => "https://fapi.binance.com/fapi/v1/klines",
            Market::CoinM => "https://dapi.binance.com/dapi/v1/klines",
        }
    }

    pub fn page_limit(self) -> usize {
        match self {
            Market::Spot => 1000,
            Market::UsdM | Market::CoinM => 1500,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: i64,
    msg: String,
}

/// Parse one klines page. Rows are `[open_time, open, high, low, close, volume, ...]`
/// with prices as decimal strings.
fn parse_klines(body: &str) -> Result<Vec<(Timestamp, [f64; 5])>> {
    let rows: Vec<Vec<Value>> = serde_json::from_str(body)
        .map_err(|e| BarlabError::Source(format!("unexpected klines payload: {e}")))?;

    let number = |v: &Value, field: &str| -> Result<f64> {
        match v {
            Value::String(s) => s
                .parse::<f64>()
                .map_err(|e| BarlabError::Source(format!("{field} '{s}': {e}"))),
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| BarlabError::Source(format!("{field} out of range"))),
            other => Err(BarlabError::Source(format!("{field} has type {other}"))),
        }
    };

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        if row.len() < 6 {
            return Err(BarlabError::Source(format!(
                "kline row has {} fields, expected at least 6",
                row.len()
            )));
        }
        let open_time = row[0]
            .as_i64()
            .ok_or_else(|| BarlabError::Source("kline open time is not an integer".into()))?;
        out.push((
            Timestamp::from_millis(open_time),
            [
                number(&row[1], "open")?,
                number(&row[2], "high")?,
                number(&row[3], "low")?,
                number(&row[4], "close")?,
                number(&row[5], "volume")?,
            ],
        ));
    }
    Ok(out)
}

/// Wait before retry number `attempt` (1-based): exponential backoff, but never
/// shorter than a server-provided `retry-after`.
fn retry_delay(base: Duration, attempt: u32, retry_after: Option<Duration>) -> Duration {
    let backoff = base * 2u32.pow(attempt.saturating_sub(1));
    retry_after.map_or(backoff, |wait| wait.max(backoff))
}

/// Binance REST data source.
pub struct BinanceSource {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    max_retries: u32,
    base_delay: Duration,
}

impl BinanceSource {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("barlab/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BarlabError::Source(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    /// First day with klines on the exchange. Earlier days are not requested.
    pub fn listing_start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2017, 7, 14).unwrap_or(NaiveDate::MIN)
    }

    /// One page of klines starting at `start`. `None` when the symbol is unknown.
    fn fetch_page(
        &self,
        market: Market,
        symbol: &str,
        timeframe: Timeframe,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Option<Vec<(Timestamp, [f64; 5])>>> {
        let query = [
            ("symbol", symbol.to_string()),
            ("interval", timeframe.label().to_string()),
            ("startTime", start.millis().to_string()),
            ("endTime", end.millis().to_string()),
            ("limit", market.page_limit().to_string()),
        ];

        let mut last_error = None;
        let mut retry_after = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                std::thread::sleep(retry_delay(self.base_delay, attempt, retry_after.take()));
            }
            if !self.circuit_breaker.is_allowed() {
                return Err(BarlabError::Source(format!(
                    "circuit breaker open, retry in {}s",
                    self.circuit_breaker.remaining_cooldown().as_secs()
                )));
            }

            let resp = match self.client.get(market.klines_url()).query(&query).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    self.circuit_breaker.record_failure();
                    last_error = Some(BarlabError::Source(format!("network: {e}")));
                    continue;
                }
                Err(e) => return Err(BarlabError::Source(format!("request failed: {e}"))),
            };

            let status = resp.status();
            if status == reqwest::StatusCode::IM_A_TEAPOT {
                // IP ban
                self.circuit_breaker.trip();
                return Err(BarlabError::Source("IP banned by exchange (HTTP 418)".into()));
            }
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                self.circuit_breaker.record_failure();
                let wait = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                warn!(symbol, retry_after = wait, "rate limited");
                retry_after = Some(Duration::from_secs(wait));
                last_error = Some(BarlabError::Source(format!(
                    "rate limited, retry after {wait}s"
                )));
                continue;
            }

            let body = resp
                .text()
                .map_err(|e| BarlabError::Source(format!("read body: {e}")))?;

            if status.is_client_error() {
                if let Ok(api) = serde_json::from_str::<ApiError>(&body) {
                    if api.code == INVALID_SYMBOL {
                        return Ok(None);
                    }
                    return Err(BarlabError::Source(format!("HTTP {status}: {}", api.msg)));
                }
                return Err(BarlabError::Source(format!("HTTP {status} for {symbol}")));
            }
            if !status.is_success() {
                self.circuit_breaker.record_failure();
                last_error = Some(BarlabError::Source(format!("HTTP {status} for {symbol}")));
                continue;
            }

            let page = parse_klines(&body)?;
            self.circuit_breaker.record_success();
            return Ok(Some(page));
        }

        Err(last_error.unwrap_or_else(|| BarlabError::Source("max retries exceeded".into())))
    }
}

impl DataSource for BinanceSource {
    fn name(&self) -> &str {
        "binance"
    }

    fn fetch_day(&self, symbol: &str, timeframe: Timeframe, day: NaiveDate) -> Result<DayFetch> {
        if day < Self::listing_start() {
            debug!(symbol, %day, "before exchange listing");
            return Ok(DayFetch::NotFound);
        }
        let (market, exchange_symbol) = Market::split(symbol);
        let day_end = Timestamp::end_of_day(day);
        let mut start = Timestamp::start_of_day(day);
        let mut bars = RawDayBars::empty();

        loop {
            let Some(page) = self.fetch_page(market, &exchange_symbol, timeframe, start, day_end)?
            else {
                return Ok(DayFetch::NotFound);
            };
            let page_len = page.len();
            for (time, [open, high, low, close, volume]) in page {
                if time > day_end {
                    break;
                }
                if bars.time.last().is_some_and(|last| *last >= time) {
                    continue;
                }
                bars.push(time, open, high, low, close, volume);
            }
            debug!(symbol, %day, page_len, total = bars.len(), "klines page");

            match bars.time.last() {
                Some(last) if page_len >= market.page_limit() && *last < day_end => {
                    start = last.saturating_add_millis(timeframe.duration_ms());
                }
                _ => break,
            }
        }

        if bars.is_empty() {
            return Ok(DayFetch::NotFound);
        }
        Ok(DayFetch::Bars(bars))
    }
}
