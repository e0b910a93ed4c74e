//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: Async functions in the core library MUST NOT use blocking I/O.
//! **Required**: `tokio::fs`, `tokio::net`, streaming `reqwest`.
//! **Acceptable**: Blocking I/O in plain functions (configuration loading
//! runs before any session starts), and test code.
//!
//! The CLI is excluded: it owns the terminal and writes to stdout directly.

use architectural_enforcement::{
    is_in_async_function, production_sources, report, scan, CORE_DIR,
};

fn blocking_kind(code: &str) -> Option<&'static str> {
    if code.contains("std::fs::") || code.contains("use std::fs") {
        Some("Blocking file I/O")
    } else if code.contains("std::net::") || code.contains("use std::net") {
        Some("Blocking network I/O")
    } else if code.contains("std::process::Command") {
        Some("Blocking process I/O")
    } else if code.contains("reqwest::blocking") {
        Some("Blocking HTTP client")
    } else if code.contains("std::io::stdin()") || code.contains("std::io::stdout()") {
        Some("Blocking stdin/stdout")
    } else {
        None
    }
}

#[test]
fn test_no_blocking_io_in_async_core_code() {
    let sources = production_sources(&format!("{CORE_DIR}/src"));
    assert!(!sources.is_empty(), "no core sources found");

    let violations = scan(&sources, |_, lines, idx, code| {
        let kind = blocking_kind(code)?;
        // Imports sit outside any function and are always flagged
        let import = code.trim_start().starts_with("use ");
        (import || is_in_async_function(lines, idx)).then_some(kind)
    });

    report("Blocking I/O found in async core code:", &violations);
}

#[test]
fn test_no_blocking_http_anywhere() {
    let sources = production_sources(&format!("{CORE_DIR}/src"));
    let violations = scan(&sources, |_, _, _, code| {
        code.contains("reqwest::blocking").then_some("Blocking HTTP client")
    });
    report("Blocking HTTP client found:", &violations);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocking_detection() {
        let code = [
            "async fn bad_function() {",
            "    let contents = std::fs::read_to_string(\"file.txt\")?;",
            "}",
        ];
        assert_eq!(blocking_kind(code[1]), Some("Blocking file I/O"));
        assert!(is_in_async_function(&code, 1));
    }

    #[test]
    fn test_plain_function_is_acceptable() {
        let code = [
            "fn load_config() {",
            "    let contents = std::fs::read_to_string(\"config.toml\")?;",
            "}",
        ];
        assert!(!is_in_async_function(&code, 1));
    }

    #[test]
    fn test_async_io_is_not_flagged() {
        assert_eq!(blocking_kind("let data = tokio::fs::read(path).await?;"), None);
    }
}
