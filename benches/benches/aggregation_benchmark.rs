//! Aggregation and normalization throughput.
//!
//! Run with: `cargo bench --package dollarbars-bench`

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use dollarbars_bench::{bench_market, raw_tape, seed, seeded_memory_store, tape};
use dollarbars_lib::{
    AggregateConfig, BarGenerator, BarSeries, BatchNormalizer, Decimal, DollarBarAggregator,
    MemoryStore, SortOrder, SqliteStore,
};
use std::hint::black_box;
use std::time::Duration;

const TAPE_LEN: usize = 100_000;

fn aggregator_benchmark(c: &mut Criterion) {
    let trades = tape(TAPE_LEN);
    let mut group = c.benchmark_group("aggregator");
    group.throughput(Throughput::Elements(TAPE_LEN as u64));

    for interval in [10_000i64, 100_000, 1_000_000] {
        group.bench_with_input(
            BenchmarkId::new("push_page", interval),
            &Decimal::from(interval),
            |b, &interval| {
                b.iter(|| {
                    let mut aggregator = DollarBarAggregator::new(interval).unwrap();
                    let mut bars = 0;
                    for page in trades.chunks(10_000) {
                        bars += aggregator.push_page(page.to_vec()).len();
                    }
                    black_box(bars)
                });
            },
        );
    }
    group.finish();
}

fn generator_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("generator");
    group.throughput(Throughput::Elements(TAPE_LEN as u64));
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(20));

    for page_size in [1_000usize, 10_000] {
        group.bench_with_input(
            BenchmarkId::new("memory", page_size),
            &page_size,
            |b, &page_size| {
                b.iter_batched(
                    || seeded_memory_store(TAPE_LEN),
                    |store: MemoryStore| {
                        let series = BarSeries::new(bench_market(), Decimal::from(100_000));
                        BarGenerator::new(&store, series, AggregateConfig { page_size })
                            .unwrap()
                            .run()
                            .unwrap()
                    },
                    criterion::BatchSize::LargeInput,
                );
            },
        );
    }

    let trades = tape(TAPE_LEN);
    group.bench_function("sqlite", |b| {
        b.iter_batched(
            || {
                let dir = tempfile::tempdir().unwrap();
                let store = SqliteStore::in_dir(dir.path()).unwrap();
                seed(&store, &trades);
                (dir, store)
            },
            |(_dir, store)| {
                let series = BarSeries::new(bench_market(), Decimal::from(100_000));
                BarGenerator::new(&store, series, AggregateConfig::default())
                    .unwrap()
                    .run()
                    .unwrap()
            },
            criterion::BatchSize::LargeInput,
        );
    });
    group.finish();
}

fn normalizer_benchmark(c: &mut Criterion) {
    let raw = raw_tape(TAPE_LEN);
    let mut group = c.benchmark_group("normalizer");
    group.throughput(Throughput::Elements(TAPE_LEN as u64));

    for (name, order) in [("native_id", SortOrder::NativeId), ("timestamp", SortOrder::Timestamp)] {
        group.bench_function(name, |b| {
            b.iter_batched(
                || raw.clone(),
                |raw| {
                    let normalizer = BatchNormalizer::new(order);
                    normalizer.normalize(raw).unwrap()
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    aggregator_benchmark,
    generator_benchmark,
    normalizer_benchmark
);
criterion_main!(benches);
