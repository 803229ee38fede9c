//! Criterion benchmarks for the simulation hot paths.
//!
//! Benchmarks:
//! 1. Signal sequence builder (forward threshold, reverse hindsight)
//! 2. Ledger replay
//! 3. Full build run through the engine (build + replay + commit)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

use cryptotrack_core::data::PartitionInputs;
use cryptotrack_core::domain::{
    Interval, LedgerOwner, PartitionKey, PriceCandle, SentimentSample, SimulationKey, StrategyId,
};
use cryptotrack_core::engine::{build_sequence, replay, SimulationEngine};
use cryptotrack_core::store::MarketStore;
use cryptotrack_core::strategy::StrategyRegistry;

// ── Helpers ──────────────────────────────────────────────────────────

fn partition() -> PartitionKey {
    PartitionKey::new("BENCH", "USD", "1d", "bench").unwrap()
}

fn make_candles(n: usize) -> Vec<PriceCandle> {
    let start = Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let wave = ((i as f64 * 0.1).sin() * 1000.0) as i64;
            let close = Decimal::from(10_000 + wave);
            PriceCandle {
                partition: partition(),
                timestamp: start + Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: Decimal::from(1_000),
                sentiment_date: None,
            }
        })
        .collect()
}

fn make_sentiment(n: usize) -> Vec<SentimentSample> {
    let start = Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap().date_naive();
    (0..n)
        .map(|i| {
            SentimentSample::from_scores(
                start + Duration::days(i as i64),
                Interval::Day,
                Some(20 + (i % 50) as u32),
                Some(100),
                false,
            )
        })
        .collect()
}

fn make_inputs(n: usize) -> PartitionInputs {
    PartitionInputs::new(partition(), make_candles(n)).with_sentiment(make_sentiment(n))
}

// ── 1. Builder ───────────────────────────────────────────────────────

fn bench_builder(c: &mut Criterion) {
    let mut group = c.benchmark_group("signal_builder");
    let registry = StrategyRegistry::builtin();

    for &n in &[365, 1825, 3650] {
        let inputs = make_inputs(n);
        for id in [1, 3] {
            let def = registry.resolve(StrategyId(id)).unwrap();
            group.bench_with_input(BenchmarkId::new(def.name.clone(), n), &n, |b, _| {
                b.iter(|| build_sequence(black_box(def), black_box(&inputs)));
            });
        }
    }

    group.finish();
}

// ── 2. Ledger Replay ─────────────────────────────────────────────────

fn bench_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger_replay");
    let registry = StrategyRegistry::builtin();
    let def = registry.resolve(StrategyId(3)).unwrap();
    let key = SimulationKey::new(partition(), StrategyId(3));
    let owner = LedgerOwner::default();

    for &n in &[365, 1825, 3650] {
        let inputs = make_inputs(n);
        let sequence = build_sequence(def, &inputs).unwrap();
        group.bench_with_input(BenchmarkId::new("hindsight", n), &n, |b, _| {
            b.iter(|| {
                replay(
                    black_box(&key),
                    &owner,
                    black_box(&sequence.records),
                    black_box(&inputs),
                )
            });
        });
    }

    group.finish();
}

// ── 3. Full Build Run ────────────────────────────────────────────────

fn bench_full_run(c: &mut Criterion) {
    let store = Arc::new(MarketStore::new());
    store.replace_sentiment(Interval::Day, make_sentiment(1825));
    store.replace_candles(&partition(), make_candles(1825)).unwrap();
    let engine = SimulationEngine::new(store);

    c.bench_function("build_all_5y", |b| {
        b.iter(|| engine.build_all(black_box(&partition())));
    });
}

criterion_group!(benches, bench_builder, bench_replay, bench_full_run);
criterion_main!(benches);
