//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: Async code in the station crates MUST NOT use blocking I/O.
//! **Required**: `tokio::fs`, `tokio::net`, `tokio::io` inside async functions.
//!
//! Blocking calls are tolerated in plain functions that run before the
//! runtime is busy (configuration loading) or on dedicated threads (the
//! operator console reader), and in test modules.

use std::fs;
use std::path::Path;

use architectural_enforcement::{
    is_in_async_function, production_source_dirs, rust_files, test_module_start,
};

/// Calls that block the executor thread when made from async code
const BLOCKING_CALLS: &[(&str, &str)] = &[
    ("std::fs::", "Blocking file I/O"),
    ("std::net::", "Blocking network I/O"),
    ("std::process::Command", "Blocking process I/O"),
    ("std::io::stdin()", "Blocking stdin"),
    ("std::io::stdout()", "Blocking stdout"),
    (".blocking_send(", "Blocking channel send"),
    (".blocking_recv(", "Blocking channel receive"),
];

/// Module imports that make blocking calls look innocent at the call site
const BLOCKING_IMPORTS: &[&str] = &["use std::fs", "use std::net"];

#[test]
fn test_no_blocking_io_in_production_code() {
    let mut violations = Vec::new();
    for dir in production_source_dirs() {
        assert!(dir.exists(), "missing source directory {}", dir.display());
        for file in rust_files(&dir) {
            check_file(&file, &mut violations);
        }
    }

    if !violations.is_empty() {
        eprintln!("\nBlocking I/O found in async production code:\n");
        for violation in &violations {
            eprintln!("  {violation}");
        }
        eprintln!("\nUse tokio::fs, tokio::net and tokio::io inside async functions.");

        panic!("Found {} blocking I/O violation(s)", violations.len());
    }
}

fn check_file(path: &Path, violations: &mut Vec<String>) {
    let Ok(content) = fs::read_to_string(path) else {
        return;
    };
    let lines: Vec<&str> = content.lines().collect();
    let end = test_module_start(&lines).unwrap_or(lines.len());

    for (idx, line) in lines[..end].iter().enumerate() {
        let code = line.split("//").next().unwrap_or(line);
        if code.trim().is_empty() {
            continue;
        }

        for import in BLOCKING_IMPORTS {
            if code.trim_start().starts_with(import) {
                violations.push(format!(
                    "{}:{} - Blocking module import: {}",
                    path.display(),
                    idx + 1,
                    line.trim()
                ));
            }
        }

        if !is_in_async_function(&lines, idx) {
            continue;
        }
        for (pattern, what) in BLOCKING_CALLS {
            if code.contains(pattern) {
                violations.push(format!(
                    "{}:{} - {what}: {}",
                    path.display(),
                    idx + 1,
                    line.trim()
                ));
            }
        }
    }
}

#[test]
fn test_detects_blocking_call_in_async_fn() {
    let code = [
        "pub async fn load(path: &Path) -> io::Result<String> {",
        "    std::fs::read_to_string(path)",
        "}",
    ];
    assert!(is_in_async_function(&code, 1));
}

#[test]
fn test_plain_fn_is_exempt() {
    let code = [
        "fn apply_file(path: &Path) -> io::Result<String> {",
        "    std::fs::read_to_string(path)",
        "}",
    ];
    assert!(!is_in_async_function(&code, 1));
}

#[test]
fn test_test_module_detection() {
    let code = [
        "pub fn real() {}",
        "",
        "#[cfg(test)]",
        "mod tests {",
        "    fn helper() { std::fs::write(\"x\", \"y\").unwrap(); }",
        "}",
    ];
    assert_eq!(test_module_start(&code), Some(2));
}
