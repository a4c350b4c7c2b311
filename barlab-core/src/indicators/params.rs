//! Indicator parameters: an ordered name → value map.

use crate::error::{BarlabError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Integers parse as `Int`, other numbers as `Float`, anything else as `Text`.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Ok(i) = raw.parse::<i64>() {
            ParamValue::Int(i)
        } else if let Ok(f) = raw.parse::<f64>() {
            ParamValue::Float(f)
        } else {
            ParamValue::Text(raw.to_string())
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(i) => write!(f, "{i}"),
            ParamValue::Float(x) => write!(f, "{x}"),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(i64::from(v))
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        ParamValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndicatorParams {
    values: BTreeMap<String, ParamValue>,
}

impl IndicatorParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<ParamValue>) {
        self.values.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Parse `key=value` pairs, as given on the command line.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut params = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (key, value) = pair.split_once('=').ok_or_else(|| BarlabError::InvalidParameter {
                name: pair.to_string(),
                reason: "expected key=value".into(),
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(BarlabError::InvalidParameter {
                    name: pair.to_string(),
                    reason: "empty parameter name".into(),
                });
            }
            params.set(key, ParamValue::parse(value));
        }
        Ok(params)
    }

    /// Integer parameter that has no default.
    pub fn required_int(&self, name: &str) -> Result<i64> {
        if !self.values.contains_key(name) {
            return Err(BarlabError::InvalidParameter {
                name: name.to_string(),
                reason: "missing".into(),
            });
        }
        self.int(name, 0)
    }

    /// Integer parameter. Floats with no fractional part are accepted.
    pub fn int(&self, name: &str, default: i64) -> Result<i64> {
        match self.values.get(name) {
            None => Ok(default),
            Some(ParamValue::Int(i)) => Ok(*i),
            Some(ParamValue::Float(f)) if f.fract() == 0.0 && f.is_finite() => Ok(*f as i64),
            Some(other) => Err(BarlabError::InvalidParameter {
                name: name.to_string(),
                reason: format!("expected an integer, got '{other}'"),
            }),
        }
    }

    pub fn float(&self, name: &str, default: f64) -> Result<f64> {
        match self.values.get(name) {
            None => Ok(default),
            Some(ParamValue::Int(i)) => Ok(*i as f64),
            Some(ParamValue::Float(f)) => Ok(*f),
            Some(ParamValue::Text(s)) => Err(BarlabError::InvalidParameter {
                name: name.to_string(),
                reason: format!("expected a number, got '{s}'"),
            }),
        }
    }

    pub fn text(&self, name: &str, default: &str) -> Result<String> {
        match self.values.get(name) {
            None => Ok(default.to_string()),
            Some(ParamValue::Text(s)) => Ok(s.clone()),
            Some(other) => Err(BarlabError::InvalidParameter {
                name: name.to_string(),
                reason: format!("expected text, got '{other}'"),
            }),
        }
    }
}
