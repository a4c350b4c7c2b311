//! Indicator modules and the registry that resolves them by name.
//!
//! A module is a named transform: it pulls OHLCV from a [`SeriesSource`]
//! for the requested symbol, timeframe and range, applies calculator
//! primitives, and returns a new [`IndicatorData`] on the same time axis.
//! The registry is built once per session; lookup is by case-insensitive name.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod params;
pub mod sma;

pub use adx::Adx;
pub use atr::Atr;
pub use bollinger::BollingerBands;
pub use ema::Ema;
pub use params::{IndicatorParams, ParamValue};
pub use sma::Sma;

use crate::error::{BarlabError, Result};
use crate::series::{IndicatorData, OHLCV_COLUMNS};
use crate::time::{Timeframe, Timestamp};
use std::collections::BTreeMap;

/// What an indicator is asked to cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesRequest {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub begin: Option<Timestamp>,
    pub end: Option<Timestamp>,
}

impl SeriesRequest {
    pub fn new(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        begin: Option<Timestamp>,
        end: Option<Timestamp>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            begin,
            end,
        }
    }
}

/// Anything that can supply OHLCV for a request.
pub trait SeriesSource {
    fn ohlcv(&self, request: &SeriesRequest) -> Result<IndicatorData>;
}

/// A named indicator transform.
pub trait IndicatorModule: Send + Sync {
    /// Registry name, e.g. `"SMA"`.
    fn name(&self) -> &'static str;

    /// Parameters and defaults, for listings.
    fn signature(&self) -> &'static str;

    fn compute(
        &self,
        source: &dyn SeriesSource,
        request: &SeriesRequest,
        params: &IndicatorParams,
    ) -> Result<IndicatorData>;
}

/// Name → module map.
pub struct IndicatorRegistry {
    modules: BTreeMap<String, Box<dyn IndicatorModule>>,
}

impl IndicatorRegistry {
    pub fn empty() -> Self {
        Self {
            modules: BTreeMap::new(),
        }
    }

    /// SMA, EMA, BollingerBands, ATR, ADX.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(Sma));
        registry.register(Box::new(Ema));
        registry.register(Box::new(BollingerBands));
        registry.register(Box::new(Atr));
        registry.register(Box::new(Adx));
        registry
    }

    /// Add a module, replacing any module of the same name.
    pub fn register(&mut self, module: Box<dyn IndicatorModule>) {
        self.modules.insert(module.name().to_ascii_lowercase(), module);
    }

    pub fn get(&self, name: &str) -> Result<&dyn IndicatorModule> {
        self.modules
            .get(&name.to_ascii_lowercase())
            .map(|m| m.as_ref())
            .ok_or_else(|| BarlabError::InvalidParameter {
                name: "indicator".into(),
                reason: format!("unknown indicator '{name}'"),
            })
    }

    pub fn modules(&self) -> impl Iterator<Item = &dyn IndicatorModule> {
        self.modules.values().map(|m| m.as_ref())
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl Default for IndicatorRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Validate a window parameter against the series length.
///
/// Must be a positive integer no larger than `len`; otherwise `TooLittleData`.
pub(crate) fn window(indicator: &str, param: &str, value: i64, len: usize) -> Result<usize> {
    if value < 1 {
        return Err(BarlabError::TooLittleData {
            indicator: indicator.to_string(),
            reason: format!("{param} must be a positive integer, got {value}"),
        });
    }
    let value = usize::try_from(value).unwrap_or(usize::MAX);
    if value > len {
        return Err(BarlabError::TooLittleData {
            indicator: indicator.to_string(),
            reason: format!("{param} {value} exceeds the {len} bars available"),
        });
    }
    Ok(value)
}

/// Require at least `needed` bars.
pub(crate) fn require_bars(indicator: &str, needed: usize, len: usize) -> Result<()> {
    if len < needed {
        return Err(BarlabError::TooLittleData {
            indicator: indicator.to_string(),
            reason: format!("needs at least {needed} bars, {len} available"),
        });
    }
    Ok(())
}

/// Translate primitive-level `InsufficientData` into the user-facing `TooLittleData`.
pub(crate) fn from_primitive(indicator: &str) -> impl Fn(BarlabError) -> BarlabError + '_ {
    move |e| match e {
        BarlabError::InsufficientData { needed, available } => BarlabError::TooLittleData {
            indicator: indicator.to_string(),
            reason: format!("needs at least {needed} values, {available} available"),
        },
        other => other,
    }
}

/// Which OHLCV column a single-input indicator reads.
pub(crate) fn value_field(params: &IndicatorParams) -> Result<String> {
    let field = params.text("value", "close")?.to_ascii_lowercase();
    if !OHLCV_COLUMNS.contains(&field.as_str()) {
        return Err(BarlabError::InvalidParameter {
            name: "value".into(),
            reason: format!("'{field}' is not one of {}", OHLCV_COLUMNS.join(", ")),
        });
    }
    Ok(field)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_resolves_case_insensitively() {
        let registry = IndicatorRegistry::standard();
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.get("sma").unwrap().name(), "SMA");
        assert_eq!(registry.get("BollingerBands").unwrap().name(), "BollingerBands");
        assert!(matches!(
            registry.get("MACD"),
            Err(BarlabError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn window_bounds() {
        assert_eq!(window("SMA", "period", 3, 10).unwrap(), 3);
        assert!(matches!(
            window("SMA", "period", 11, 10),
            Err(BarlabError::TooLittleData { .. })
        ));
        assert!(matches!(
            window("SMA", "period", 0, 10),
            Err(BarlabError::TooLittleData { .. })
        ));
    }

    #[test]
    fn primitive_errors_are_translated() {
        let e = from_primitive("ADX")(BarlabError::InsufficientData {
            needed: 5,
            available: 2,
        });
        assert!(matches!(e, BarlabError::TooLittleData { .. }));
    }

    #[test]
    fn value_field_must_be_ohlcv() {
        let p = IndicatorParams::new().with("value", "HIGH");
        assert_eq!(value_field(&p).unwrap(), "high");
        let p = IndicatorParams::new().with("value", "vwap");
        assert!(value_field(&p).is_err());
    }
}
