//! Criterion view of the contention benchmark
//!
//! The `contention-bench` binary is the primary harness. This suite drives the
//! same thread groups through criterion's `iter_custom` so results can be compared
//! across commits with criterion's own baselines: each sample runs 6 insert threads
//! against 6 delete threads, every thread performing `iters` operations on one key.

use contention_bench::bench::{BenchmarkGroup, Blackhole, GroupName};
use contention_bench::map::{ContendedMap, FlurryMap, Identifier, LockedHashMap, ShardedMap};
use contention_bench::state::SharedState;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

fn run_group<M>(group: &BenchmarkGroup, iters: u64) -> Duration
where
    M: ContendedMap<Identifier, Identifier> + 'static,
{
    let state = Arc::new(SharedState::<M>::setup());
    let barrier = Arc::new(Barrier::new(group.total_threads() + 1));
    let mut handles = vec![];

    for member in &group.members {
        for _ in 0..member.threads {
            let state = Arc::clone(&state);
            let barrier = Arc::clone(&barrier);
            let operation = member.operation;
            handles.push(thread::spawn(move || {
                let mut sink = Blackhole::new();
                barrier.wait();
                for _ in 0..iters {
                    operation.apply(&state, &mut sink);
                }
                black_box(sink);
            }));
        }
    }

    barrier.wait();
    let start = Instant::now();
    for handle in handles {
        handle.join().unwrap();
    }
    let elapsed = start.elapsed();

    black_box(state.verify().unwrap());
    elapsed
}

fn bench_single_key_contention(c: &mut Criterion) {
    let mut bench_group = c.benchmark_group("single_key_contention");
    bench_group.measurement_time(Duration::from_secs(10));

    for name in GroupName::ALL {
        let group = BenchmarkGroup::declared(name);
        bench_group.throughput(Throughput::Elements(group.total_threads() as u64));

        bench_group.bench_with_input(BenchmarkId::new("flurry", name), &group, |b, group| {
            b.iter_custom(|iters| run_group::<FlurryMap>(group, iters))
        });

        bench_group.bench_with_input(BenchmarkId::new("dashmap", name), &group, |b, group| {
            b.iter_custom(|iters| run_group::<ShardedMap>(group, iters))
        });

        bench_group.bench_with_input(BenchmarkId::new("locked", name), &group, |b, group| {
            b.iter_custom(|iters| {
                run_group::<LockedHashMap<Identifier, Identifier>>(group, iters)
            })
        });
    }

    bench_group.finish();
}

fn bench_uncontended_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("uncontended_single_thread");

    group.bench_function("flurry_insert_then_compute", |b| {
        let state = SharedState::<FlurryMap>::setup();
        let mut sink = Blackhole::new();
        b.iter(|| {
            contention_bench::bench::insert(&state, &mut sink);
            contention_bench::bench::delete_via_conditional_update(&state, &mut sink);
        });
        black_box(sink);
    });

    group.bench_function("flurry_insert_then_remove", |b| {
        let state = SharedState::<FlurryMap>::setup();
        let mut sink = Blackhole::new();
        b.iter(|| {
            contention_bench::bench::insert(&state, &mut sink);
            contention_bench::bench::delete_via_direct_removal(&state, &mut sink);
        });
        black_box(sink);
    });

    group.finish();
}

criterion_group!(benches, bench_single_key_contention, bench_uncontended_operations);
criterion_main!(benches);
