//! Barlab CLI: fetch OHLCV series and compute indicators.
//!
//! Commands:
//! - `ohlcv`: assemble an OHLCV series through the day cache
//! - `indicator`: run a named indicator with `key=value` parameters
//! - `indicators`: list registered indicators and their parameters
//!
//! Output is CSV on stdout (or `--output FILE`), or JSON with `--json`.
//! Logs go to stderr; set `RUST_LOG` to override the default `barlab=info`.

use anyhow::{Context, Result};
use barlab_core::config::SourceConfig;
use barlab_core::data::{BlobStore, FsBlobStore, MemoryBlobStore};
use barlab_core::{Bounds, IndicatorData, IndicatorParams, Session, SessionConfig, Timeframe};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "barlab", about = "Barlab CLI: cached OHLCV bars and indicators")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Path to a TOML session config.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cache directory. Overrides the config file.
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Data source. Overrides the config file.
    #[arg(long, value_enum, global = true)]
    source: Option<SourceKind>,

    /// Root directory for `--source csv`.
    #[arg(long, global = true)]
    csv_root: Option<PathBuf>,

    /// Keep fetched days in memory only.
    #[arg(long, default_value_t = false, global = true)]
    no_cache: bool,

    /// Fetch days in parallel.
    #[arg(long, default_value_t = false, global = true)]
    parallel: bool,

    /// Write output to a file instead of stdout.
    #[arg(long, short, global = true)]
    output: Option<PathBuf>,

    /// Emit JSON instead of CSV.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum SourceKind {
    Synthetic,
    Csv,
    Binance,
}

#[derive(Args)]
struct RangeArgs {
    /// Symbol (e.g. BTCUSDT, um/ethusdt).
    symbol: String,

    /// Bar timeframe: 1m 3m 5m 15m 30m 1h 2h 4h 6h 8h 12h 1d.
    #[arg(long, short, default_value = "1d")]
    timeframe: Timeframe,

    /// Begin: YYYYMMDD, YYYY-MM-DD, or a date-time. Defaults to the session's.
    #[arg(long)]
    begin: Option<String>,

    /// End (inclusive). Defaults to the session's.
    #[arg(long)]
    end: Option<String>,
}

impl RangeArgs {
    fn bounds(&self) -> Bounds {
        Bounds {
            begin: self.begin.as_deref().map(Into::into),
            end: self.end.as_deref().map(Into::into),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble an OHLCV series.
    Ohlcv {
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Compute a registered indicator.
    Indicator {
        /// Indicator name (case-insensitive), e.g. SMA, BollingerBands, ADX.
        name: String,

        #[command(flatten)]
        range: RangeArgs,

        /// Parameters as key=value, repeatable (e.g. -p period=20 -p deviation=2).
        #[arg(long = "param", short = 'p')]
        params: Vec<String>,
    },
    /// List registered indicators.
    Indicators,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("barlab=info")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let session = build_session(&cli.global)?;

    match &cli.command {
        Commands::Ohlcv { range } => {
            let report = session.ohlcv_report(&range.symbol, range.timeframe, &range.bounds())?;
            info!(
                bars = report.series.len(),
                gaps = report.gaps.len(),
                cache_hits = report.cache_hits,
                fetched = report.fetched,
                "ohlcv ready"
            );
            emit(&cli.global, &report.series)
        }
        Commands::Indicator {
            name,
            range,
            params,
        } => {
            let params = IndicatorParams::from_pairs(params)?;
            let data = session.indicator(
                name,
                &range.symbol,
                range.timeframe,
                &range.bounds(),
                &params,
            )?;
            emit(&cli.global, &data)
        }
        Commands::Indicators => {
            let mut out = open_output(&cli.global)?;
            for module in session.registry().modules() {
                writeln!(out, "{:<16} {}", module.name(), module.signature())?;
            }
            out.flush()?;
            Ok(())
        }
    }
}

fn build_session(args: &GlobalArgs) -> Result<Session> {
    let mut config = match &args.config {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SessionConfig::default(),
    };
    apply_overrides(&mut config, args)?;

    let store: Arc<dyn BlobStore> = if args.no_cache {
        Arc::new(MemoryBlobStore::new())
    } else {
        Arc::new(FsBlobStore::new(&config.cache_dir))
    };
    let session = config.builder_with_store(store)?.build()?;
    let cache = if args.no_cache {
        "memory".to_string()
    } else {
        config.cache_dir.display().to_string()
    };
    info!(source = session.source_name(), cache = %cache, "session ready");
    Ok(session)
}

/// Command-line flags win over the config file. A `--source` matching the
/// configured kind keeps that table's settings.
fn apply_overrides(config: &mut SessionConfig, args: &GlobalArgs) -> Result<()> {
    if let Some(dir) = &args.cache_dir {
        config.cache_dir = dir.clone();
    }
    if args.parallel {
        config.parallel_fetch = true;
    }
    match (args.source, &config.source) {
        (Some(SourceKind::Synthetic), SourceConfig::Synthetic { .. }) => {}
        (Some(SourceKind::Synthetic), _) => config.source = SourceConfig::default(),
        (Some(SourceKind::Csv), current) => {
            let root = match (&args.csv_root, current) {
                (Some(root), _) => root.clone(),
                (None, SourceConfig::Csv { root }) => root.clone(),
                (None, _) => anyhow::bail!("--source csv requires --csv-root"),
            };
            config.source = SourceConfig::Csv { root };
        }
        (Some(SourceKind::Binance), _) => config.source = SourceConfig::Binance,
        (None, _) => {
            if let Some(root) = &args.csv_root {
                config.source = SourceConfig::Csv { root: root.clone() };
            }
        }
    }
    Ok(())
}

fn open_output(args: &GlobalArgs) -> Result<Box<dyn Write>> {
    Ok(match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}

fn emit(args: &GlobalArgs, data: &IndicatorData) -> Result<()> {
    let mut out = open_output(args)?;
    if args.json {
        serde_json::to_writer_pretty(&mut out, data)?;
        writeln!(out)?;
    } else {
        data.write_csv(&mut out)?;
    }
    out.flush()?;
    if let Some(path) = &args.output {
        info!(rows = data.len(), path = %path.display(), "output written");
    }
    Ok(())
}
