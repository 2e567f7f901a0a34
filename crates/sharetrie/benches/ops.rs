//! Criterion benchmarks: persistent edits vs transactional batches.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sharetrie_rs::TrieMap;

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    for n in [100u64, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::new("persistent", n), &n, |b, &n| {
            b.iter(|| {
                let mut m: TrieMap<u64, u64> = TrieMap::new();
                for i in 0..n {
                    m = m.insert(black_box(i), i);
                }
                m
            });
        });
        group.bench_with_input(BenchmarkId::new("transaction", n), &n, |b, &n| {
            b.iter(|| {
                TrieMap::<u64, u64>::new().transaction(|tx| {
                    for i in 0..n {
                        tx.insert(black_box(i), i).unwrap();
                    }
                })
            });
        });
    }
    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let m: TrieMap<u64, u64> = (0..10_000).map(|i| (i, i)).collect();
    c.bench_function("get/hit", |b| {
        b.iter(|| m.get(black_box(&5_000)));
    });
    c.bench_function("get/miss", |b| {
        b.iter(|| m.get(black_box(&50_000)));
    });
}

fn bench_remove(c: &mut Criterion) {
    let m: TrieMap<u64, u64> = (0..10_000).map(|i| (i, i)).collect();
    c.bench_function("remove/persistent", |b| {
        b.iter(|| m.remove(black_box(&5_000)));
    });
    c.bench_function("remove/batch", |b| {
        b.iter(|| {
            m.transaction(|tx| {
                for i in 0..100 {
                    tx.remove(black_box(&i)).unwrap();
                }
            })
        });
    });
}

fn bench_merge(c: &mut Criterion) {
    let a: TrieMap<u64, u64> = (0..5_000).map(|i| (i, i)).collect();
    let b_map: TrieMap<u64, u64> = (2_500..7_500).map(|i| (i, i)).collect();
    c.bench_function("merge/overlapping", |b| {
        b.iter(|| a.merge(black_box(&b_map)));
    });
}

criterion_group!(benches, bench_insert, bench_get, bench_remove, bench_merge);
criterion_main!(benches);
