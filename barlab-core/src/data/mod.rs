//! Data retrieval: sources, day cache, and series assembly.

pub mod assembler;
pub mod binance;
pub mod blob;
pub mod cache;
pub mod circuit_breaker;
pub mod clock;
pub mod codec;
pub mod csv_source;
pub mod provider;
pub mod synthetic;

pub use assembler::{AssemblyReport, SeriesAssembler};
pub use binance::BinanceSource;
pub use blob::{BlobStore, FsBlobStore, MemoryBlobStore};
pub use cache::{CacheKey, DayCache, DayOrigin};
pub use circuit_breaker::CircuitBreaker;
pub use clock::{Clock, FixedClock, SystemClock};
pub use csv_source::CsvSource;
pub use provider::{DataSource, DayFetch, RawDayBars};
pub use synthetic::SyntheticSource;
