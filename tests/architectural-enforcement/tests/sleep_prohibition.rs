//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code never sleeps to wait for something. Sessions
//! suspend only on transport reads and channel sends (a `timeout` bounds the
//! final cancel notice); playback is the one timer-driven component, and
//! every playback timer races the cancel signal so nothing keeps ticking
//! after a cancel.
//!
//! **Exceptions**: none. Tests are excluded from the scan.

use architectural_enforcement::{
    context_contains, production_sources, report, scan, SourceFile, PRODUCTION_DIRS,
};

const TIMER_MODULE: &str = "core/src/playback.rs";

fn all_sources() -> Vec<SourceFile> {
    PRODUCTION_DIRS
        .iter()
        .flat_map(|dir| production_sources(dir))
        .collect()
}

fn is_sleep_call(code: &str) -> bool {
    code.contains("::sleep(") || code.contains(".sleep(") || code.contains("sleep_until(")
}

#[test]
fn test_sources_are_found() {
    let sources = all_sources();
    assert!(
        sources.iter().any(|f| f.is(TIMER_MODULE)),
        "scanner did not find the playback module; check workspace_root()"
    );
}

#[test]
fn test_no_thread_sleep_in_production_code() {
    let violations = scan(&all_sources(), |_, _, _, code| {
        code.contains("thread::sleep").then_some("Blocking sleep")
    });
    report("Blocking sleeps found in production code:", &violations);
}

#[test]
fn test_timers_only_in_playback() {
    let violations = scan(&all_sources(), |file, _, _, code| {
        (is_sleep_call(code) && !file.is(TIMER_MODULE)).then_some("Timer outside playback")
    });
    report(
        "Timers found outside the playback engine (sessions must only wait on I/O):",
        &violations,
    );
}

#[test]
fn test_playback_timers_race_cancel() {
    let violations = scan(&all_sources(), |file, lines, idx, code| {
        if !file.is(TIMER_MODULE) || !is_sleep_call(code) {
            return None;
        }
        let raced = context_contains(lines, idx, 6, 0, "select!")
            && context_contains(lines, idx, 6, 6, "cancelled()");
        (!raced).then_some("Timer not raced against cancel")
    });
    report(
        "Playback timers must sit in a tokio::select! with the cancel signal:",
        &violations,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sleep_call_detection() {
        assert!(is_sleep_call("    () = tokio::time::sleep(delay) => {}"));
        assert!(is_sleep_call("std::thread::sleep(d);"));
        assert!(is_sleep_call("tokio::time::sleep_until(deadline).await;"));
        assert!(!is_sleep_call("let asleep = false;"));
    }

    #[test]
    fn test_raced_timer_detection() {
        let code = [
            "tokio::select! {",
            "    biased;",
            "    () = cancel.cancelled() => break,",
            "    () = tokio::time::sleep(delay) => {}",
            "}",
        ];
        assert!(context_contains(&code, 3, 6, 0, "select!"));
        assert!(context_contains(&code, 3, 6, 6, "cancelled()"));
    }
}
