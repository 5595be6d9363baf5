//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code in termwise-core MUST NOT sleep or block a
//! runtime thread. Stream deadlines use `tokio::time::sleep_until` raced in
//! `select!`, which waits on a timer rather than polling.

use architectural_enforcement::{core_src_dir, scan};

#[test]
fn test_no_sleep_in_production_code() {
    let violations = scan(&core_src_dir(), |line| {
        if line.code.contains("thread::sleep") {
            Some("Thread sleep")
        } else if line.code.contains("time::sleep(") {
            Some("Sleep in production path")
        } else if line.code.contains("block_on(") {
            Some("Blocking on a future")
        } else {
            None
        }
    });

    if !violations.is_empty() {
        eprintln!("\nSleep or blocking waits found in production code:\n");
        for violation in &violations {
            eprintln!("  {violation}");
        }
        eprintln!("\nWait on channels, cancellation tokens or deadlines instead.");
        panic!("Found {} sleep violation(s)", violations.len());
    }
}

#[test]
fn test_core_sources_are_scanned() {
    let files = architectural_enforcement::production_files(&core_src_dir());
    assert!(files.iter().any(|p| p.ends_with("pump.rs")));
    assert!(!files.iter().any(|p| p.ends_with("test_utils.rs")));
}
