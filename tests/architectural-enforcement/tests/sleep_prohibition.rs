//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Station production code waits on I/O and channels, never on
//! the clock. Timers belong in tests only.

use std::fs;

use architectural_enforcement::{production_source_dirs, rust_files, test_module_start};

#[test]
fn test_no_sleep_in_production_code() {
    let mut violations = Vec::new();

    for dir in production_source_dirs() {
        for file in rust_files(&dir) {
            let Ok(content) = fs::read_to_string(&file) else {
                continue;
            };
            let lines: Vec<&str> = content.lines().collect();
            let end = test_module_start(&lines).unwrap_or(lines.len());

            for (idx, line) in lines[..end].iter().enumerate() {
                let code = line.split("//").next().unwrap_or(line);
                if code.contains("::sleep(") || code.contains(".sleep(") {
                    violations.push(format!("{}:{} - {}", file.display(), idx + 1, line.trim()));
                }
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Found sleep calls in production code:\n  {}",
        violations.join("\n  ")
    );
}
