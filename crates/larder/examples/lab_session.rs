//! Laboratory session against a tracked memory pool.
//!
//! Demonstrates: lease sensor buffers → write data → misuse (double free,
//! wrong owner, null) → growth past the largest size class → leak report,
//! then an image run through the allocation tracker. Diagnostics go to the
//! console through a `tracing_subscriber::fmt` subscriber.

use larder::prelude::*;

fn report(label: &str, result: Result<Release, PoolError>) {
    match result {
        Ok(release) if release.ownership_mismatch => println!(
            "{label}: released {} bytes, but owner was '{}'",
            release.size, release.owner
        ),
        Ok(release) => println!("{label}: released {} bytes", release.size),
        Err(e) => println!("{label}: refused ({e})"),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .init();

    println!("=== Larder Laboratory Session ===\n");
    let mut pool = MemoryPool::new();

    // --- Data processing ---
    println!("--- Laboratory Data Processing ---");
    let temperature = pool.allocate(1024, "TemperatureProcessor").unwrap();
    let humidity = pool.allocate(512, "HumidityAnalyzer").unwrap();
    let pressure = pool.allocate(2048, "PressureMonitor").unwrap();
    println!("{}", pool.status());

    let data = pool.block_mut(temperature).unwrap();
    for (i, word) in data.chunks_exact_mut(4).enumerate() {
        word.copy_from_slice(&((i as u32) * 2).to_le_bytes());
    }
    let first: Vec<u32> = pool.block(temperature).unwrap()[..20]
        .chunks_exact(4)
        .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
        .collect();
    println!("Temperature data processed. First few values: {first:?}\n");

    // --- Error conditions ---
    println!("--- Testing Error Conditions ---");
    report("humidity", pool.deallocate(humidity, "HumidityAnalyzer"));
    report("humidity again", pool.deallocate(humidity, "HumidityAnalyzer"));
    report("pressure", pool.deallocate(pressure, "WrongProcessor"));
    report("null", pool.deallocate(None, "NullTester"));
    match pool.block(humidity) {
        Ok(_) => println!("humidity buffer still readable"),
        Err(e) => println!("humidity buffer: {e}"),
    }

    // --- Cleanup ---
    println!("\n--- Proper Cleanup ---");
    report("temperature", pool.deallocate(temperature, "TemperatureProcessor"));
    println!("{}", pool.status());

    // --- Expansion ---
    println!("--- Testing Pool Expansion ---");
    let big = pool.allocate(32768, "BigDataProcessor").unwrap();
    println!("{}", pool.status());
    report("big", pool.deallocate(big, "BigDataProcessor"));

    // --- Final status ---
    println!("\n--- Final Status ---");
    let _forgotten = pool.allocate(200, "ForgetfulLogger").unwrap();
    println!("{}", pool.report_statistics());
    println!("Recorded diagnostics:");
    for diagnostic in pool.diagnostics().iter() {
        println!("  [{:?}] {diagnostic}", diagnostic.severity());
    }
    match pool.validate() {
        Ok(()) => println!("Memory validation passed\n"),
        Err(e) => println!("Memory validation failed: {e}\n"),
    }
    println!("{}", pool.shutdown());

    // --- Tracker ---
    println!("--- Allocation Tracker: Image Processing ---");
    let mut tracker = AllocationTracker::new("image-pipeline");
    for (width, height) in [(800usize, 600usize), (1024, 768)] {
        let image = tracker.allocate_array(width * height * 3).unwrap();
        let red = tracker.allocate_array(width * height).unwrap();
        tracker.deallocate_array(red).unwrap();
        println!("Processed {width}x{height} image");
        tracker.deallocate_array(image).unwrap();
    }
    let int = tracker.allocate(4, AllocKind::Single).unwrap();
    let release = tracker.deallocate_array(int).unwrap();
    println!("single freed as array, mismatch flagged: {}", release.kind_mismatch);
    println!("{}", tracker.stats());
    println!("{}", tracker.shutdown());
}
