//! Architectural Enforcement Integration Tests
//!
//! Source-scanning checks that keep the async crates honest:
//! - No blocking sleeps, and timers only where playback needs them
//! - No blocking I/O inside async functions of the core
//! - No panicking shortcuts (`unwrap`/`expect`) in production code
//! - No UI or CLI dependencies in the core crate
//!
//! The helpers here only look at production code: everything from a
//! `#[cfg(test)] mod ...` block onwards is dropped before scanning.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Production source directories, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["uistream/core/src", "uistream/cli/src"];

/// The headless library crate
pub const CORE_DIR: &str = "uistream/core";

/// Workspace root, resolved from this crate's manifest
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// One production source file
pub struct SourceFile {
    /// Path as found on disk
    pub path: PathBuf,
    /// Lines up to (not including) the unit test module
    pub lines: Vec<String>,
}

impl SourceFile {
    /// Read a file, keeping only its production part
    #[must_use]
    pub fn read(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        Some(Self {
            path: path.to_path_buf(),
            lines: production_lines(&content),
        })
    }

    /// Lines as `&str`, for the line-context helpers
    #[must_use]
    pub fn line_refs(&self) -> Vec<&str> {
        self.lines.iter().map(String::as_str).collect()
    }

    /// Whether the path ends with `suffix` (e.g. `core/src/playback.rs`)
    #[must_use]
    pub fn is(&self, suffix: &str) -> bool {
        self.path.ends_with(suffix)
    }
}

/// A rule violation at one line
pub struct Violation {
    /// File containing the violation
    pub path: PathBuf,
    /// 1-based line number
    pub line_number: usize,
    /// What rule was broken
    pub rule: &'static str,
    /// The offending line
    pub text: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} - {}: {}",
            self.path.display(),
            self.line_number,
            self.rule,
            self.text.trim()
        )
    }
}

/// All production `.rs` files under `dir` (relative to the workspace root)
#[must_use]
pub fn production_sources(dir: &str) -> Vec<SourceFile> {
    let root = workspace_root().join(dir);
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .filter_map(|entry| SourceFile::read(entry.path()))
        .collect()
}

/// Drop the `#[cfg(test)] mod ...` block and everything after it
#[must_use]
pub fn production_lines(content: &str) -> Vec<String> {
    let lines: Vec<&str> = content.lines().collect();
    let end = lines
        .windows(2)
        .position(|pair| pair[0].trim() == "#[cfg(test)]" && pair[1].trim_start().starts_with("mod "))
        .unwrap_or(lines.len());
    lines[..end].iter().map(|l| (*l).to_string()).collect()
}

/// The part of a line before any `//` comment
#[must_use]
pub fn code_part(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

/// Whether a trimmed line opens a function
#[must_use]
pub fn is_fn_header(line: &str) -> bool {
    let mut rest = line.trim();
    for prefix in ["pub(crate) ", "pub(super) ", "pub ", "async ", "unsafe "] {
        rest = rest.strip_prefix(prefix).unwrap_or(rest);
    }
    rest.starts_with("fn ")
}

/// Whether the function enclosing `idx` is `async`
#[must_use]
pub fn is_in_async_function(lines: &[&str], idx: usize) -> bool {
    for i in (0..=idx).rev() {
        let line = lines[i].trim();
        if is_fn_header(line) {
            return line.contains("async fn ");
        }
        if line.starts_with("mod ") || (line.starts_with("impl") && line.contains('{')) {
            return false;
        }
    }
    false
}

/// Whether any line in `idx - before ..= idx + after` contains `needle`
#[must_use]
pub fn context_contains(lines: &[&str], idx: usize, before: usize, after: usize, needle: &str) -> bool {
    let start = idx.saturating_sub(before);
    let end = (idx + after + 1).min(lines.len());
    lines[start..end].iter().any(|line| line.contains(needle))
}

/// Scan every production line of `files` with `check`
pub fn scan<F>(files: &[SourceFile], mut check: F) -> Vec<Violation>
where
    F: FnMut(&SourceFile, &[&str], usize, &str) -> Option<&'static str>,
{
    let mut violations = Vec::new();
    for file in files {
        let lines = file.line_refs();
        for (idx, line) in lines.iter().enumerate() {
            if let Some(rule) = check(file, &lines, idx, code_part(line)) {
                violations.push(Violation {
                    path: file.path.clone(),
                    line_number: idx + 1,
                    rule,
                    text: (*line).to_string(),
                });
            }
        }
    }
    violations
}

/// Print violations and fail the calling test
///
/// # Panics
///
/// Panics if `violations` is non-empty.
pub fn report(title: &str, violations: &[Violation]) {
    if violations.is_empty() {
        return;
    }
    eprintln!("\n{title}\n");
    for violation in violations {
        eprintln!("  {violation}");
    }
    panic!("\nFound {} violation(s). Fix these before merging!", violations.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_lines_stop_at_test_module() {
        let content = "fn a() {}\n#[cfg(test)]\npub fn helper() {}\n#[cfg(test)]\nmod tests {\n    fn b() {}\n}\n";
        let lines = production_lines(content);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], "pub fn helper() {}");
    }

    #[test]
    fn test_fn_header_detection() {
        assert!(is_fn_header("    pub async fn start(&self) {"));
        assert!(is_fn_header("pub(crate) fn from_patch_value("));
        assert!(!is_fn_header("let f = |x| x;"));
        assert!(!is_fn_header("// fn commented"));
    }

    #[test]
    fn test_async_detection() {
        let code = [
            "impl Source {",
            "    async fn open(&self) {",
            "        let x = std::fs::read(\"a\");",
            "    }",
            "    fn sync_load() {",
            "        let y = std::fs::read(\"b\");",
            "    }",
            "}",
        ];
        assert!(is_in_async_function(&code, 2));
        assert!(!is_in_async_function(&code, 5));
    }

    #[test]
    fn test_code_part_strips_comments() {
        assert_eq!(code_part("let a = 1; // sleep(1)"), "let a = 1; ");
        assert_eq!(code_part("//! docs"), "");
    }

    #[test]
    fn test_workspace_root_has_manifest() {
        assert!(workspace_root().join("Cargo.toml").exists());
    }
}
