//! Criterion benchmarks for the network passes: inline vs worker split.
//!
//! Run with: `cargo bench --bench network_bench`
//!
//! ## Benchmarks
//!
//! 1. **Small network train step**: XOR-sized baseline, never split
//! 2. **Wide network train step**: inline vs split at several widths
//! 3. **Forward only**: inference cost of a wide network
//! 4. **Worker pool**: rent/release latency of a recycled context

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use duonet::{Network, NetworkConfig, WorkerPool};
use ndarray::Array1;
use ndarray_rand::RandomExt;
use rand::distributions::Uniform;

fn bench_network(input: usize, hidden: &[usize], output: usize, parallel: bool) -> Network {
    let config = NetworkConfig {
        seed: Some(0),
        ..NetworkConfig::default()
    };
    let mut net =
        Network::new(input, hidden, output, &config).expect("Failed to create benchmark network");
    net.set_parallel(parallel)
        .expect("Failed to start calculate thread");
    net
}

// ============================================================================
// Benchmark: Small Network
// ============================================================================

fn bench_small_step(c: &mut Criterion) {
    c.bench_function("train_step_2_6_6_1", |b| {
        let mut net = bench_network(2, &[6, 6], 1, false);
        let input = ndarray::arr1(&[1.0, 0.0]);
        let target = ndarray::arr1(&[1.0]);

        b.iter(|| {
            net.train_step(black_box(&input), black_box(&target))
                .expect("train_step failed");
        });
    });
}

// ============================================================================
// Benchmark: Inline vs Split Train Step
// ============================================================================

fn bench_wide_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("wide_train_step");
    group.sample_size(20);

    for width in [64, 256, 512] {
        let input = Array1::random(32, Uniform::new(-1.0, 1.0));
        let target = Array1::random(8, Uniform::new(0.1, 0.9));

        for (label, parallel) in [("inline", false), ("split", true)] {
            group.bench_with_input(BenchmarkId::new(label, width), &width, |b, &w| {
                let mut net = bench_network(32, &[w, w], 8, parallel);
                b.iter(|| {
                    net.train_step(black_box(&input), black_box(&target))
                        .expect("train_step failed");
                });
            });
        }
    }

    group.finish();
}

// ============================================================================
// Benchmark: Forward Only
// ============================================================================

fn bench_forward(c: &mut Criterion) {
    let mut group = c.benchmark_group("forward_512");
    let input = Array1::random(32, Uniform::new(-1.0, 1.0));

    for (label, parallel) in [("inline", false), ("split", true)] {
        group.bench_function(label, |b| {
            let mut net = bench_network(32, &[512, 512], 8, parallel);
            b.iter(|| {
                black_box(net.forward(black_box(&input)).expect("forward failed"));
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Worker Pool
// ============================================================================

fn bench_worker_pool(c: &mut Criterion) {
    let pool = WorkerPool::new();

    c.bench_function("pool_rent_release_recycled", |b| {
        b.iter(|| {
            let worker = pool.rent().expect("rent failed");
            pool.release(black_box(worker)).expect("release failed");
        });
    });
}

criterion_group!(
    benches,
    bench_small_step,
    bench_wide_step,
    bench_forward,
    bench_worker_pool,
);
criterion_main!(benches);
