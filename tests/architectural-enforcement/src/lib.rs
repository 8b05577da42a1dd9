//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural rules
//! on the station crates:
//! - No blocking filesystem, network or process I/O inside async functions
//! - No blocking sleeps in production code
//!
//! The checks are line-based scans of `station/*/src`, run as ordinary tests.

use std::path::{Path, PathBuf};

/// Production source directories scanned by the enforcement tests
#[must_use]
pub fn production_source_dirs() -> Vec<PathBuf> {
    let root = workspace_root();
    vec![
        root.join("station").join("core").join("src"),
        root.join("station").join("console").join("src"),
    ]
}

/// Workspace root, two levels above this package
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// All `.rs` files under `dir`
#[must_use]
pub fn rust_files(dir: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Index of the line where a `#[cfg(test)]` module starts, if any
///
/// Everything from there to the end of the file is test code.
#[must_use]
pub fn test_module_start(lines: &[&str]) -> Option<usize> {
    lines.windows(2).position(|pair| {
        pair[0].trim() == "#[cfg(test)]" && pair[1].trim_start().starts_with("mod ")
    })
}

/// Whether `line` opens a function, and if so whether it is async
#[must_use]
pub fn fn_signature(line: &str) -> Option<bool> {
    let trimmed = line.trim_start();
    let rest = ["pub(crate) ", "pub(super) ", "pub "]
        .iter()
        .find_map(|vis| trimmed.strip_prefix(vis))
        .unwrap_or(trimmed);

    if rest.starts_with("async fn ") {
        Some(true)
    } else if rest.starts_with("fn ") {
        Some(false)
    } else {
        None
    }
}

/// Whether line `idx` sits inside an async function body
///
/// Scans backwards to the nearest function signature.
#[must_use]
pub fn is_in_async_function(lines: &[&str], idx: usize) -> bool {
    lines[..=idx]
        .iter()
        .rev()
        .find_map(|line| fn_signature(line))
        .unwrap_or(false)
}
