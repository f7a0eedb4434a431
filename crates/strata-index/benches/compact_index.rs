use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::hint::black_box;
use strata_index::CompactIndex;

const KEY_COUNT: u64 = 100_000;

fn shuffled_keys(seed: u64) -> Vec<u64> {
    let mut keys: Vec<u64> = (0..KEY_COUNT).collect();
    keys.shuffle(&mut StdRng::seed_from_u64(seed));
    keys
}

fn bench_insert(c: &mut Criterion) {
    let keys = shuffled_keys(1);
    let mut group = c.benchmark_group("insert_100k");

    group.bench_function("compact_index", |b| {
        b.iter(|| {
            let mut index = CompactIndex::new();
            for &key in &keys {
                index.upsert(black_box(key), key);
            }
            index
        })
    });

    group.bench_function("btreemap", |b| {
        b.iter(|| {
            let mut map = BTreeMap::new();
            for &key in &keys {
                map.insert(black_box(key), key);
            }
            map
        })
    });

    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let keys = shuffled_keys(2);
    let mut index = CompactIndex::new();
    for &key in &keys {
        index.upsert(key, key);
    }
    index.compact_now();

    let mut group = c.benchmark_group("lookup");
    // Static-only, then with a dynamic stage of 10% fresh keys.
    group.bench_function(BenchmarkId::new("get", "static"), |b| {
        b.iter(|| {
            let mut hits = 0u64;
            for &key in keys.iter().step_by(97) {
                hits += index.get(black_box(&key)).is_some() as u64;
            }
            hits
        })
    });

    for key in KEY_COUNT..KEY_COUNT + KEY_COUNT / 10 {
        index.upsert(key, key);
    }
    group.bench_function(BenchmarkId::new("get", "both_stages"), |b| {
        b.iter(|| {
            let mut hits = 0u64;
            for &key in keys.iter().step_by(97) {
                hits += index.get(black_box(&key)).is_some() as u64;
            }
            hits
        })
    });
    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let mut index = CompactIndex::new();
    for key in (0..KEY_COUNT).step_by(2) {
        index.upsert(key, key);
    }
    index.compact_now();
    for key in (1..KEY_COUNT).step_by(20) {
        index.upsert(key, key);
    }

    c.bench_function("scan_merged", |b| {
        b.iter(|| index.iter().map(|(_, v)| *v).sum::<u64>())
    });

    c.bench_function("range_1k", |b| {
        b.iter(|| index.range(black_box(40_000)..41_000).count())
    });
}

fn bench_compact(c: &mut Criterion) {
    let keys = shuffled_keys(3);
    c.bench_function("compact_now_100k", |b| {
        b.iter_batched(
            || {
                let mut index = CompactIndex::new();
                for &key in &keys {
                    index.upsert(key, key);
                }
                index
            },
            |mut index| {
                index.compact_now();
                index
            },
            criterion::BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, bench_insert, bench_lookup, bench_scan, bench_compact);
criterion_main!(benches);
