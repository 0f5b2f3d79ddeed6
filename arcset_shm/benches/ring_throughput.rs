//! Submit/drain throughput benchmarks

use arcset::arcset::{Edge, Record};
use arcset::config::ExchangeConfig;
use arcset::consts::BUFFER_CAPACITY;
use arcset_shm::{CancelToken, Consumer, Producer};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn bench_config(tag: &str) -> ExchangeConfig {
    ExchangeConfig::namespaced(&format!("arcset_bench_{}_{}", tag, std::process::id()))
}

fn full_record() -> Record {
    let edges: Vec<Edge> = (0..8).map(|i| Edge::new(i + 1, i)).collect();
    Record::from_edges(&edges).unwrap()
}

/// One submit followed by one drain; the ring never blocks.
fn bench_submit_drain_roundtrip(c: &mut Criterion) {
    let config = bench_config("roundtrip");
    let mut consumer = Consumer::<BUFFER_CAPACITY>::create(&config).unwrap();
    let producer = Producer::<BUFFER_CAPACITY>::attach(&config).unwrap();
    let cancel = CancelToken::new();
    let record = full_record();

    c.bench_function("submit_drain_roundtrip", |b| {
        b.iter(|| {
            black_box(producer.submit(&record, &cancel).unwrap());
            black_box(consumer.drain(&cancel).unwrap());
        });
    });
}

/// Fill the whole ring, then drain it.
fn bench_fill_and_drain(c: &mut Criterion) {
    let config = bench_config("fill");
    let mut consumer = Consumer::<BUFFER_CAPACITY>::create(&config).unwrap();
    let producer = Producer::<BUFFER_CAPACITY>::attach(&config).unwrap();
    let cancel = CancelToken::new();
    let record = full_record();

    c.bench_function("fill_and_drain_50", |b| {
        b.iter(|| {
            for _ in 0..BUFFER_CAPACITY {
                producer.submit(&record, &cancel).unwrap();
            }
            for _ in 0..BUFFER_CAPACITY {
                black_box(consumer.drain(&cancel).unwrap());
            }
        });
    });
}

/// Cost of the semaphore snapshot used for diagnostics.
fn bench_snapshot(c: &mut Criterion) {
    let config = bench_config("snapshot");
    let consumer = Consumer::<BUFFER_CAPACITY>::create(&config).unwrap();

    c.bench_function("semaphore_snapshot", |b| {
        b.iter(|| black_box(consumer.snapshot().unwrap()));
    });
}

criterion_group!(
    benches,
    bench_submit_drain_roundtrip,
    bench_fill_and_drain,
    bench_snapshot
);
criterion_main!(benches);
