//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: async functions in termwise-core MUST use async I/O.
//! **Acceptable**: blocking I/O in synchronous functions, e.g. reading the
//! config file before any stream starts.

use architectural_enforcement::{core_src_dir, scan};

#[test]
fn test_no_blocking_io_in_async_code() {
    let violations = scan(&core_src_dir(), |line| {
        if line.code.contains("reqwest::blocking") {
            return Some("Blocking HTTP client");
        }
        if !line.in_async_fn {
            return None;
        }
        if line.code.contains("std::fs::") {
            Some("Blocking file I/O in async fn")
        } else if line.code.contains("std::net::") {
            Some("Blocking network I/O in async fn")
        } else if line.code.contains("std::process::Command") {
            Some("Blocking process I/O in async fn")
        } else if line.code.contains("std::io::stdin()") || line.code.contains("std::io::stdout()") {
            Some("Blocking stdin/stdout in async fn")
        } else {
            None
        }
    });

    if !violations.is_empty() {
        eprintln!("\nBlocking I/O found in async production code:\n");
        for violation in &violations {
            eprintln!("  {violation}");
        }
        eprintln!("\nUse tokio::fs, tokio::net, tokio::io or reqwest's async client.");
        panic!("Found {} blocking I/O violation(s)", violations.len());
    }
}
