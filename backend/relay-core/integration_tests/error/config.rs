use relay_core::config::BridgeConfig;
use relay_core::error::ConfigError;

/// **VALUE**: Verifies that config validation errors point at the caller of `build`.
///
/// **WHY THIS MATTERS**: A startup failure is reported once and the process exits; the
/// location tells developers which construction site produced the bad config.
///
/// **BUG THIS CATCHES**: Would catch if `#[track_caller]` is removed from `build`,
/// making every error point into the config module instead.
#[test]
fn given_missing_host_when_built_then_error_location_is_this_file() {
    // GIVEN / WHEN
    let err = BridgeConfig::builder()
        .build()
        .expect_err("empty config must fail");

    // THEN
    let error_string = err.to_string();
    assert!(error_string.contains("Config Validation Error"));
    assert!(error_string.contains("kdbhost flag not defined"));
    assert!(error_string.contains("config.rs"));
    assert!(matches!(err, ConfigError::Validation { .. }));
}
