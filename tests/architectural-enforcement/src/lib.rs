//! Architectural Enforcement Integration Tests
//!
//! Source scans over `termwise/core/src` that keep the streaming pipeline
//! honest:
//! - No sleeping in production code; waits are on I/O, channels or deadlines
//! - No blocking I/O inside async functions
//!
//! The scanners live here so each test file stays a list of rules.

use std::fs;
use std::path::{Path, PathBuf};

/// A rule hit at a specific source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File the hit was found in
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// What rule was broken
    pub rule: &'static str,
    /// The offending line, trimmed
    pub source: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{} - {}: {}",
            self.path.display(),
            self.line,
            self.rule,
            self.source
        )
    }
}

/// One production source line with enough context to judge it
#[derive(Debug, Clone, Copy)]
pub struct SourceLine<'a> {
    /// 0-based index into the file
    pub index: usize,
    /// Line with any trailing `//` comment removed
    pub code: &'a str,
    /// Full original line
    pub raw: &'a str,
    /// Whether the nearest enclosing `fn` is `async`
    pub in_async_fn: bool,
}

/// `termwise/core/src`, resolved from this crate's manifest directory
#[must_use]
pub fn core_src_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../termwise/core/src")
}

/// All `.rs` files under `dir` except test-only helpers
#[must_use]
pub fn production_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .map(walkdir::DirEntry::into_path)
        .filter(|path| path.extension().and_then(|s| s.to_str()) == Some("rs"))
        .filter(|path| path.file_name().and_then(|s| s.to_str()) != Some("test_utils.rs"))
        .collect();
    files.sort();
    files
}

/// Production lines of `content`: comments stripped, the trailing
/// `#[cfg(test)] mod tests` block dropped
#[must_use]
pub fn production_lines(content: &str) -> Vec<SourceLine<'_>> {
    let lines: Vec<&str> = content.lines().collect();
    let test_start = test_module_start(&lines).unwrap_or(lines.len());

    let mut in_async_fn = false;
    let mut out = Vec::with_capacity(test_start);
    for (index, raw) in lines.iter().take(test_start).enumerate() {
        let trimmed = raw.trim_start();
        if trimmed.starts_with("//") {
            continue;
        }
        let code = raw.split("//").next().unwrap_or(raw);
        if let Some(is_async) = fn_header(code) {
            in_async_fn = is_async;
        }
        out.push(SourceLine {
            index,
            code,
            raw,
            in_async_fn,
        });
    }
    out
}

/// Scan every production file under `dir` with `check`
pub fn scan<F>(dir: &Path, mut check: F) -> Vec<Violation>
where
    F: FnMut(&SourceLine<'_>) -> Option<&'static str>,
{
    let mut violations = Vec::new();
    for path in production_files(dir) {
        let Ok(content) = fs::read_to_string(&path) else {
            continue;
        };
        for line in production_lines(&content) {
            if let Some(rule) = check(&line) {
                violations.push(Violation {
                    path: path.clone(),
                    line: line.index + 1,
                    rule,
                    source: line.raw.trim().to_string(),
                });
            }
        }
    }
    violations
}

fn test_module_start(lines: &[&str]) -> Option<usize> {
    lines.iter().enumerate().find_map(|(idx, line)| {
        if line.trim() != "#[cfg(test)]" {
            return None;
        }
        let next = lines[idx + 1..].iter().find(|l| !l.trim().is_empty())?;
        next.trim_start().starts_with("mod tests").then_some(idx)
    })
}

/// `Some(is_async)` when `code` opens a function
fn fn_header(code: &str) -> Option<bool> {
    let trimmed = code.trim_start();
    let without_vis = trimmed
        .strip_prefix("pub(crate) ")
        .or_else(|| trimmed.strip_prefix("pub "))
        .unwrap_or(trimmed);
    if without_vis.starts_with("async fn ") {
        Some(true)
    } else if without_vis.starts_with("fn ") || without_vis.starts_with("const fn ") {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_module_is_skipped() {
        let content = "fn a() {}\n\n#[cfg(test)]\nmod tests {\n    fn b() {}\n}\n";
        let lines = production_lines(content);
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| !l.code.contains("fn b")));
    }

    #[test]
    fn test_async_tracking() {
        let content = "pub async fn a() {\n    x();\n}\nfn b() {\n    y();\n}\n";
        let lines = production_lines(content);
        let x = lines.iter().find(|l| l.code.contains("x()")).unwrap();
        let y = lines.iter().find(|l| l.code.contains("y()")).unwrap();
        assert!(x.in_async_fn);
        assert!(!y.in_async_fn);
    }

    #[test]
    fn test_comments_are_ignored() {
        let content = "// std::thread::sleep\nfn a() { b(); } // block_on\n";
        let lines = production_lines(content);
        assert_eq!(lines.len(), 1);
        assert!(!lines[0].code.contains("block_on"));
    }
}
