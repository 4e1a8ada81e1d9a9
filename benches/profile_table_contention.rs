//! Profile table hot path benchmark
//!
//! Measures `log_call` on an existing key (shared read lock plus two
//! atomics), on a full table (drop path), and under contention from several
//! threads hitting the same and different shards.
//!
//! # Run Instructions
//!
//! ```bash
//! cargo bench --bench profile_table_contention
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use riskcall::runtime::{ProfileTable, DEFAULT_CAPACITY};
use std::thread;

const CALLS_PER_THREAD: u64 = 1_000;

/// Benchmark: repeated hit on one existing key
fn bench_log_existing(c: &mut Criterion) {
    let table = ProfileTable::new(DEFAULT_CAPACITY);
    table.log_call("strcpy", "main");

    c.bench_function("log_call_existing", |b| {
        b.iter(|| table.log_call(black_box("strcpy"), black_box("main")))
    });
}

/// Benchmark: new keys against a full table
fn bench_log_dropped(c: &mut Criterion) {
    let table = ProfileTable::new(1);
    table.log_call("strcpy", "main");

    c.bench_function("log_call_table_full", |b| {
        b.iter(|| table.log_call(black_box("strcpy"), black_box("other")))
    });
}

/// Benchmark: N threads, all on one key vs. one key per thread
fn bench_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("log_call_contention");

    for threads in [1usize, 2, 4, 8] {
        group.throughput(Throughput::Elements(threads as u64 * CALLS_PER_THREAD));

        group.bench_with_input(BenchmarkId::new("same_key", threads), &threads, |b, &n| {
            let table = ProfileTable::new(DEFAULT_CAPACITY);
            b.iter(|| {
                thread::scope(|scope| {
                    for _ in 0..n {
                        scope.spawn(|| {
                            for _ in 0..CALLS_PER_THREAD {
                                table.log_call(black_box("strcpy"), black_box("main"));
                            }
                        });
                    }
                })
            });
        });

        group.bench_with_input(BenchmarkId::new("own_key", threads), &threads, |b, &n| {
            let table = ProfileTable::new(DEFAULT_CAPACITY);
            let callers: Vec<String> = (0..n).map(|i| format!("worker_{}", i)).collect();
            b.iter(|| {
                thread::scope(|scope| {
                    for caller in &callers {
                        let table = &table;
                        scope.spawn(move || {
                            for _ in 0..CALLS_PER_THREAD {
                                table.log_call(black_box("strcpy"), black_box(caller));
                            }
                        });
                    }
                })
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_log_existing, bench_log_dropped, bench_contention);
criterion_main!(benches);
