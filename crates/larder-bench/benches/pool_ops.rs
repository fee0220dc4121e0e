//! Criterion micro-benchmarks for pool allocate, release, growth and leak scans.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use larder_bench::{lease_sizes, reference_config, stress_config};
use larder_pool::MemoryPool;
use larder_test_utils::{churn_script, run_churn};

/// Benchmark: build the default pool (20 pre-allocated blocks).
fn bench_pool_new(c: &mut Criterion) {
    c.bench_function("pool_new_default", |b| {
        b.iter(|| {
            let pool = MemoryPool::with_config(reference_config()).unwrap();
            black_box(pool.shutdown());
        });
    });
}

/// Benchmark: lease and release one block from each size class.
fn bench_lease_release(c: &mut Criterion) {
    let mut pool = MemoryPool::with_config(stress_config()).unwrap();
    let sizes = lease_sizes(5);
    c.bench_function("pool_lease_release_5", |b| {
        b.iter(|| {
            for &size in &sizes {
                let handle = pool.allocate(size, "bench").unwrap();
                black_box(pool.deallocate(handle, "bench").unwrap());
            }
        });
    });
}

/// Benchmark: fill 200 leases so the first-fit scan walks a busy pool.
fn bench_first_fit_scan(c: &mut Criterion) {
    let sizes = lease_sizes(200);
    c.bench_function("pool_first_fit_200", |b| {
        b.iter(|| {
            let mut pool = MemoryPool::with_config(stress_config()).unwrap();
            let handles: Vec<_> = sizes
                .iter()
                .map(|&size| pool.allocate(size, "bench").unwrap())
                .collect();
            for handle in handles {
                pool.deallocate(handle, "bench").unwrap();
            }
            black_box(pool.shutdown());
        });
    });
}

/// Benchmark: grow an empty pool by 100 exact-size blocks.
fn bench_growth(c: &mut Criterion) {
    c.bench_function("pool_growth_100", |b| {
        b.iter(|| {
            let mut pool = MemoryPool::with_config(larder_pool::PoolConfig::empty()).unwrap();
            for i in 1..=100 {
                black_box(pool.allocate(i * 32, "bench").unwrap());
            }
            black_box(pool.shutdown());
        });
    });
}

/// Benchmark: replay a seeded 1000-step churn script.
fn bench_churn(c: &mut Criterion) {
    let script = churn_script(42, 1000, 8192);
    c.bench_function("pool_churn_1000", |b| {
        b.iter(|| {
            let mut pool = MemoryPool::with_config(stress_config()).unwrap();
            black_box(run_churn(&mut pool, &script).unwrap());
            black_box(pool.shutdown());
        });
    });
}

/// Benchmark: leak report over a pool with half its blocks leased.
fn bench_leak_scan(c: &mut Criterion) {
    let mut pool = MemoryPool::with_config(stress_config()).unwrap();
    for size in lease_sizes(160) {
        pool.allocate(size, "bench").unwrap();
    }
    c.bench_function("pool_leak_scan_160", |b| {
        b.iter(|| black_box(pool.report_leaks()));
    });
}

criterion_group!(
    benches,
    bench_pool_new,
    bench_lease_release,
    bench_first_fit_scan,
    bench_growth,
    bench_churn,
    bench_leak_scan
);
criterion_main!(benches);
