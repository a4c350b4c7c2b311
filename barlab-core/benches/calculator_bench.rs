//! Criterion benchmarks for Barlab hot paths.
//!
//! Benchmarks:
//! 1. Calculator primitives (SMA, rolling stddev, Wilder smoothing, EMA)
//! 2. Indicator modules over an in-memory series (Bollinger, ADX)
//! 3. Day codec (Parquet encode/decode of one 1m day)
//! 4. Series assembly from a warm in-memory cache

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

use barlab_core::calculator;
use barlab_core::data::codec::{decode_day, encode_day};
use barlab_core::data::{DataSource, DayFetch, FixedClock, MemoryBlobStore, SyntheticSource};
use barlab_core::{Bounds, Session, Timeframe};
use chrono::NaiveDate;

// ── Helpers ──────────────────────────────────────────────────────────

fn make_values(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 100.0 + (i as f64 * 0.1).sin() * 10.0 + i as f64 * 0.01)
        .collect()
}

fn bench_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 7, 1).unwrap()
}

fn warm_session() -> Session {
    let session = Session::builder(SyntheticSource::new(7), Arc::new(MemoryBlobStore::new()))
        .clock(Arc::new(FixedClock(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())))
        .period("2022-07-01", "2022-07-31")
        .build()
        .unwrap();
    session
        .ohlcv("BENCH", Timeframe::M5, &Bounds::session())
        .unwrap();
    session
}

// ── 1. Calculator Primitives ─────────────────────────────────────────

fn bench_primitives(c: &mut Criterion) {
    let mut group = c.benchmark_group("primitives");

    for &n in &[1_000usize, 10_000, 100_000] {
        let values = make_values(n);
        group.bench_with_input(BenchmarkId::new("sma_20", n), &values, |b, v| {
            b.iter(|| calculator::sma(black_box(v), 20).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("stddev_20", n), &values, |b, v| {
            b.iter(|| calculator::rolling_stddev(black_box(v), 20).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("wilder_14", n), &values, |b, v| {
            b.iter(|| calculator::wilder_smooth(black_box(v), 14).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("ema_20", n), &values, |b, v| {
            b.iter(|| calculator::ema(black_box(v), 20).unwrap())
        });
    }

    group.finish();
}

// ── 2. Indicator Modules ─────────────────────────────────────────────

fn bench_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicators");
    let session = warm_session();

    group.bench_function("bollinger_20_2_m5_month", |b| {
        b.iter(|| {
            session
                .bollinger_bands("BENCH", Timeframe::M5, &Bounds::session(), 20, 2.0)
                .unwrap()
        });
    });

    group.bench_function("adx_14_14_m5_month", |b| {
        b.iter(|| {
            session
                .adx("BENCH", Timeframe::M5, &Bounds::session(), 14, 14)
                .unwrap()
        });
    });

    group.finish();
}

// ── 3. Day Codec ─────────────────────────────────────────────────────

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    let bars = match SyntheticSource::new(3)
        .fetch_day("BENCH", Timeframe::M1, bench_day())
        .unwrap()
    {
        DayFetch::Bars(bars) => bars,
        DayFetch::NotFound => panic!("synthetic source returned no bars"),
    };
    let bytes = encode_day(&bars).unwrap();

    group.bench_function("encode_m1_day", |b| {
        b.iter(|| encode_day(black_box(&bars)).unwrap())
    });
    group.bench_function("decode_m1_day", |b| {
        b.iter(|| decode_day(black_box(&bytes)).unwrap())
    });

    group.finish();
}

// ── 4. Warm Assembly ─────────────────────────────────────────────────

fn bench_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("assembly");
    let session = warm_session();

    group.bench_function("m5_month_warm_cache", |b| {
        b.iter(|| {
            session
                .ohlcv(black_box("BENCH"), Timeframe::M5, &Bounds::session())
                .unwrap()
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_primitives,
    bench_indicators,
    bench_codec,
    bench_assembly,
);
criterion_main!(benches);
