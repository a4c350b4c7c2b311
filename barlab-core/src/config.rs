//! TOML session configuration.
//!
//! ```toml
//! cache_dir = "data/cache"
//! date_begin = 20220901
//! date_end = "2022-09-05"
//! parallel_fetch = true
//!
//! [source]
//! type = "synthetic"
//! seed = 42
//! ```

use crate::data::{
    BinanceSource, BlobStore, CircuitBreaker, CsvSource, DataSource, FsBlobStore, SyntheticSource,
};
use crate::error::{BarlabError, Result};
use crate::session::{Session, SessionBuilder};
use crate::time::{TimeRange, TimeSpec};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A bound as written in TOML: an integer `YYYYMMDD` or any normalizer string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigTime {
    Int(i64),
    Text(String),
}

impl ConfigTime {
    pub fn to_spec(&self) -> TimeSpec {
        match self {
            ConfigTime::Int(i) => TimeSpec::from(*i),
            ConfigTime::Text(s) => TimeSpec::from(s.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceConfig {
    Synthetic {
        #[serde(default)]
        seed: u64,
        #[serde(default)]
        available_from: Option<ConfigTime>,
        #[serde(default)]
        available_to: Option<ConfigTime>,
    },
    Csv {
        root: PathBuf,
    },
    Binance,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Synthetic {
            seed: 0,
            available_from: None,
            available_to: None,
        }
    }
}

impl SourceConfig {
    /// Instantiate the configured connector.
    pub fn build(&self) -> Result<Box<dyn DataSource>> {
        match self {
            SourceConfig::Synthetic {
                seed,
                available_from,
                available_to,
            } => {
                let mut source = SyntheticSource::new(*seed);
                match (available_from, available_to) {
                    (None, None) => {}
                    (Some(from), Some(to)) => {
                        let period = TimeRange::new(
                            from.to_spec().normalize(false)?,
                            to.to_spec().normalize(true)?,
                        )?;
                        source = source.with_available(period);
                    }
                    _ => {
                        return Err(BarlabError::InvalidConstructorArgument(
                            "synthetic source needs both available_from and available_to".into(),
                        ))
                    }
                }
                Ok(Box::new(source))
            }
            SourceConfig::Csv { root } => Ok(Box::new(CsvSource::new(root))),
            SourceConfig::Binance => Ok(Box::new(BinanceSource::new(Arc::new(
                CircuitBreaker::exchange_default(),
            ))?)),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("data/cache")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default)]
    pub date_begin: Option<ConfigTime>,
    #[serde(default)]
    pub date_end: Option<ConfigTime>,
    #[serde(default)]
    pub parallel_fetch: bool,
    #[serde(default)]
    pub source: SourceConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            date_begin: None,
            date_end: None,
            parallel_fetch: false,
            source: SourceConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| BarlabError::Config(format!("read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| BarlabError::Config(e.to_string()))
    }

    /// Session builder with a filesystem cache under `cache_dir`.
    ///
    /// Callers can still adjust the builder (clock, extra modules) before `build`.
    pub fn builder(&self) -> Result<SessionBuilder> {
        self.builder_with_store(Arc::new(FsBlobStore::new(&self.cache_dir)))
    }

    /// Same as [`builder`](Self::builder) over an explicit blob store; `cache_dir` is ignored.
    pub fn builder_with_store(&self, store: Arc<dyn BlobStore>) -> Result<SessionBuilder> {
        let source = self.source.build()?;
        let mut builder = Session::builder(source, store).parallel_fetch(self.parallel_fetch);
        if let Some(begin) = &self.date_begin {
            builder = builder.date_begin(begin.to_spec());
        }
        if let Some(end) = &self.date_end {
            builder = builder.date_end(end.to_spec());
        }
        Ok(builder)
    }

    pub fn build(&self) -> Result<Session> {
        self.builder()?.build()
    }
}
