//! Integration test: log output of teardown and misuse.
//!
//! Installs a scoped `fmt` subscriber that writes into a shared buffer,
//! runs a pool or tracker through a scenario, and checks which events
//! came out, at which level and in which order.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use larder_core::AllocKind;
use larder_pool::AllocationTracker;
use larder_test_utils::lab_pool;

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `scenario` under a capturing subscriber and return its output lines.
fn capture(scenario: impl FnOnce()) -> Vec<String> {
    let out = Captured::default();
    let writer = out.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::with_default(subscriber, scenario);
    let bytes = out.0.lock().unwrap().clone();
    String::from_utf8(bytes)
        .unwrap()
        .lines()
        .map(str::to_owned)
        .collect()
}

fn position(lines: &[String], needle: &str) -> usize {
    lines
        .iter()
        .position(|l| l.contains(needle))
        .unwrap_or_else(|| panic!("no line containing {needle:?} in {lines:#?}"))
}

#[test]
fn dropping_leaky_pool_reports_before_freeing() {
    let lines = capture(|| {
        let mut pool = lab_pool();
        pool.allocate(100, "sensor").unwrap();
        drop(pool);
    });

    let leak = position(&lines, "memory leak ");
    assert!(lines[leak].contains("WARN"));
    assert!(lines[leak].contains("size=256"));
    assert!(lines[leak].contains("owner=\"sensor\""));

    let summary = position(&lines, "memory leaks detected");
    assert!(lines[summary].contains("WARN"));
    assert!(lines[summary].contains("count=1"));

    let destroying = position(&lines, "destroying memory pool");
    let destroyed = position(&lines, "memory pool destroyed");
    assert!(destroying < leak);
    assert!(leak < destroyed);
    assert!(lines[destroyed].contains("blocks=20"));
}

#[test]
fn clean_teardown_logs_no_leaks() {
    let lines = capture(|| {
        let mut pool = lab_pool();
        let h = pool.allocate(64, "sensor").unwrap();
        pool.deallocate(h, "sensor").unwrap();
    });

    let clean = position(&lines, "no memory leaks detected");
    assert!(lines[clean].contains("INFO"));
    assert!(lines.iter().all(|l| !l.contains("WARN")));
}

#[test]
fn shutdown_then_drop_reports_once() {
    let lines = capture(|| {
        let mut pool = lab_pool();
        pool.allocate(64, "sensor").unwrap();
        let report = pool.shutdown();
        assert_eq!(report.len(), 1);
    });

    let count = |needle: &str| lines.iter().filter(|l| l.contains(needle)).count();
    assert_eq!(count("destroying memory pool"), 1);
    assert_eq!(count("memory pool destroyed"), 1);
    assert_eq!(count("memory leaks detected"), 1);
}

#[test]
fn misuse_is_logged_at_its_severity() {
    let lines = capture(|| {
        let mut pool = lab_pool();
        let h = pool.allocate(64, "owner").unwrap();
        pool.deallocate(h, "intruder").unwrap();
        let _ = pool.deallocate(h, "owner");
        let _ = pool.deallocate(None, "nobody");
        let _ = pool.allocate(0, "zero");
    });

    let level_of = |needle: &str| {
        let line = &lines[position(&lines, needle)];
        if line.contains("ERROR") {
            "ERROR"
        } else if line.contains("WARN") {
            "WARN"
        } else {
            "OTHER"
        }
    };
    assert_eq!(level_of("deallocating memory owned by another requester"), "WARN");
    assert_eq!(level_of("double deallocation"), "ERROR");
    assert_eq!(level_of("attempted to deallocate a null handle"), "WARN");
    assert_eq!(level_of("cannot allocate 0 bytes"), "WARN");
}

#[test]
fn dropping_tracker_reports_leaks_and_summary() {
    let lines = capture(|| {
        let mut tracker = AllocationTracker::new("images");
        tracker.allocate_array(50).unwrap();
        let single = tracker.allocate(4, AllocKind::Single).unwrap();
        tracker.deallocate_array(single).unwrap();
    });

    let mismatch = position(&lines, "allocation kind mismatch");
    assert!(lines[mismatch].contains("WARN"));

    let leak = position(&lines, "memory leak ");
    assert!(lines[leak].contains("WARN"));
    assert!(lines[leak].contains("size=50"));

    let summary = position(&lines, "final memory report");
    assert!(lines[summary].contains("INFO"));
    assert!(leak < summary);
}
