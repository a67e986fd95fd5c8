// tests/logging_filter.rs

use loopflow::cli::LogLevel;
use loopflow::logging::build_filter;

#[test]
fn test_cli_level_overrides_env() {
    let filter = build_filter(Some(LogLevel::Debug), Some("loopflow::propagator=trace"));
    assert_eq!(filter.to_string(), "debug");
}

#[test]
fn test_env_directives_are_kept_per_target() {
    let filter = build_filter(None, Some(" info,loopflow::propagator=trace "));
    let rendered = filter.to_string();
    assert!(rendered.contains("loopflow::propagator=trace"), "filter: {rendered}");
    assert!(rendered.contains("info"), "filter: {rendered}");
}

#[test]
fn test_missing_or_bad_env_falls_back_to_info() {
    assert_eq!(build_filter(None, None).to_string(), "info");
    assert_eq!(build_filter(None, Some("   ")).to_string(), "info");
    assert_eq!(build_filter(None, Some("loopflow=loud")).to_string(), "info");
}
