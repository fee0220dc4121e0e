//! Integration test: the laboratory session against a default pool.
//!
//! Replays a sensor-processing session end to end: three buffers leased
//! from the pre-allocated size classes, a double free, a release by the
//! wrong owner, a null release, then growth past the largest class and
//! teardown. Checks counters and diagnostics after each phase.

use larder_core::{Diagnostic, Inspect, PoolError};
use larder_pool::{MemoryPool, PoolConfig};
use larder_test_utils::{churn_script, lab_pool, run_churn, single_class_pool};

#[test]
fn first_fit_then_ownership_mismatch() {
    let mut pool = lab_pool();
    let handle = pool.allocate(1024, "A").unwrap();
    assert_eq!(pool.block(handle).unwrap().len(), 1024);
    assert_eq!(pool.report_statistics().used_bytes, 1024);

    let release = pool.deallocate(handle, "B").unwrap();
    assert!(release.ownership_mismatch);
    assert_eq!(release.owner, "A");
    assert_eq!(pool.report_statistics().used_bytes, 0);
    assert!(matches!(
        pool.diagnostics().last(),
        Some(Diagnostic::OwnershipMismatch { .. })
    ));
}

#[test]
fn oversized_request_grows_by_exact_size() {
    let mut pool = lab_pool();
    let before = pool.report_statistics();
    let big = pool.allocate(32768, "Big").unwrap();
    let after = pool.report_statistics();
    assert_eq!(after.total_bytes, before.total_bytes + 32768);
    assert_eq!(after.block_count, before.block_count + 1);
    assert_eq!(after.growth_events, 1);
    assert_eq!(pool.block(big).unwrap().len(), 32768);
    pool.deallocate(big, "Big").unwrap();
    assert_eq!(pool.used_bytes(), 0);
}

#[test]
fn laboratory_session() {
    let mut pool = lab_pool();
    let initial_total = pool.total_bytes();
    assert_eq!(initial_total, 4 * (64 + 256 + 1024 + 4096 + 16384));

    // Processing phase.
    let temperature = pool.allocate(1024, "TemperatureProcessor").unwrap();
    let humidity = pool.allocate(512, "HumidityAnalyzer").unwrap();
    let pressure = pool.allocate(2048, "PressureMonitor").unwrap();
    // 512 skips the 64 and 256 classes and lands in the next free 1024 block;
    // 2048 lands in the first 4096 block.
    assert_eq!(pool.used_bytes(), 1024 + 1024 + 4096);
    assert_eq!(pool.status().used_blocks(), 3);

    let data = pool.block_mut(temperature).unwrap();
    for (i, chunk) in data.chunks_exact_mut(4).enumerate() {
        chunk.copy_from_slice(&((i as u32) * 2).to_le_bytes());
    }
    let data = pool.block(temperature).unwrap();
    assert_eq!(u32::from_le_bytes([data[8], data[9], data[10], data[11]]), 4);

    // Misuse phase.
    pool.deallocate(humidity, "HumidityAnalyzer").unwrap();
    let used = pool.used_bytes();
    assert!(matches!(
        pool.deallocate(humidity, "HumidityAnalyzer"),
        Err(PoolError::DoubleFree { .. })
    ));
    assert_eq!(pool.used_bytes(), used);

    assert!(pool
        .deallocate(pressure, "WrongProcessor")
        .unwrap()
        .ownership_mismatch);
    assert!(matches!(
        pool.deallocate(None, "NullTester"),
        Err(PoolError::NullHandle { .. })
    ));

    // Cleanup phase.
    pool.deallocate(temperature, "TemperatureProcessor").unwrap();
    assert_eq!(pool.used_bytes(), 0);

    // Expansion phase.
    let big = pool.allocate(32768, "BigDataProcessor").unwrap();
    assert_eq!(pool.total_bytes(), initial_total + 32768);
    pool.deallocate(big, "BigDataProcessor").unwrap();

    let stats = pool.report_statistics();
    assert_eq!(stats.allocations, 4);
    assert_eq!(stats.deallocations, 4);
    assert_eq!(stats.double_frees, 1);
    assert_eq!(stats.ownership_mismatches, 1);
    assert_eq!(stats.peak_bytes, 32768);
    assert_eq!(pool.diagnostics().count_kind("double_free"), 1);
    assert_eq!(pool.diagnostics().count_kind("null_handle"), 1);
    assert!(pool.validate().is_ok());
    assert!(pool.shutdown().is_empty());
}

#[test]
fn outstanding_leases_are_reported_at_shutdown() {
    let mut pool = lab_pool();
    pool.allocate(100, "sensor").unwrap();
    pool.allocate(5000, "encoder").unwrap();
    let report = pool.shutdown();
    assert_eq!(report.len(), 2);
    assert_eq!(report.total_bytes(), 256 + 16384);
    let owners: Vec<_> = report.iter().filter_map(|l| l.owner.as_deref()).collect();
    assert_eq!(owners, ["sensor", "encoder"]);
    assert!(report.to_string().contains("Total leaked: 2 blocks"));
}

#[test]
fn exhausted_class_falls_through_to_growth() {
    let mut pool = single_class_pool(64, 2);
    pool.allocate(64, "a").unwrap();
    pool.allocate(64, "b").unwrap();
    assert_eq!(pool.report_statistics().growth_events, 0);
    pool.allocate(10, "c").unwrap();
    let stats = pool.report_statistics();
    assert_eq!(stats.growth_events, 1);
    assert_eq!(stats.total_bytes, 138);
    assert_eq!(stats.used_bytes, 138);
}

#[test]
fn invalid_config_is_rejected() {
    let config = PoolConfig::empty().with_size_class(0, 4);
    assert!(matches!(
        MemoryPool::with_config(config),
        Err(PoolError::Config(_))
    ));
}

#[test]
fn empty_config_grows_from_nothing() {
    let mut pool = MemoryPool::with_config(PoolConfig::empty()).unwrap();
    assert_eq!(pool.total_bytes(), 0);
    let h = pool.allocate(300, "first").unwrap();
    assert_eq!(pool.total_bytes(), 300);
    pool.deallocate(h, "first").unwrap();
}

#[test]
fn seeded_churn_stays_consistent() {
    for seed in [1, 2, 3, 0xC0FFEE] {
        let mut pool = lab_pool();
        let outcome = run_churn(&mut pool, &churn_script(seed, 500, 20_000)).unwrap();
        assert!(pool.validate().is_ok());
        let stats = pool.report_statistics();
        assert_eq!(stats.active_count, outcome.live.len());
        assert_eq!(stats.allocations as usize, outcome.allocated);
        assert_eq!(stats.deallocations as usize, outcome.released);
        assert_eq!(pool.report_leaks().total_bytes(), stats.used_bytes);
        assert!(stats.peak_bytes >= stats.used_bytes);
    }
}

#[test]
fn pools_are_inspectable_uniformly() {
    let mut a = lab_pool();
    let b = lab_pool();
    a.allocate(10, "x").unwrap();
    let pools: [&dyn Inspect; 2] = [&a, &b];
    let leaks: Vec<usize> = pools.iter().map(|p| p.report_leaks().len()).collect();
    assert_eq!(leaks, [1, 0]);
    assert!(pools.iter().all(|p| p.validate().is_ok()));
    assert_ne!(pools[0].id(), pools[1].id());
}
