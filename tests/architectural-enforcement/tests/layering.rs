//! Integration Test: Core Layering
//!
//! **Policy**: `uistream-core` is headless. It must not depend on terminal,
//! argument-parsing or subscriber crates, and its production code never
//! panics on bad input: errors propagate, malformed lines are skipped.

use std::fs;

use architectural_enforcement::{production_sources, report, scan, workspace_root, CORE_DIR};

const FORBIDDEN_CORE_DEPS: &[&str] = &[
    "clap",
    "crossterm",
    "ratatui",
    "tracing-subscriber",
    "anyhow",
];

#[test]
fn test_core_has_no_frontend_dependencies() {
    let manifest = fs::read_to_string(workspace_root().join(CORE_DIR).join("Cargo.toml"))
        .expect("core manifest should be readable");

    let found: Vec<&str> = FORBIDDEN_CORE_DEPS
        .iter()
        .copied()
        .filter(|dep| {
            manifest
                .lines()
                .any(|line| line.trim_start().starts_with(&format!("{dep} =")))
        })
        .collect();

    assert!(
        found.is_empty(),
        "uistream-core must stay headless, found dependencies: {found:?}"
    );
}

#[test]
fn test_no_unwrap_or_expect_in_core() {
    let sources = production_sources(&format!("{CORE_DIR}/src"));
    let violations = scan(&sources, |_, _, _, code| {
        if code.contains(".unwrap()") {
            Some("unwrap() in production code")
        } else if code.contains(".expect(") {
            Some("expect() in production code")
        } else {
            None
        }
    });
    report(
        "Panicking shortcuts found in core production code (propagate errors instead):",
        &violations,
    );
}
