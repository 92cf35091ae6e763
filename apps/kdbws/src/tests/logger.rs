// Unit tests for logger module initialization logic
// The logger is process-global, so everything that installs it lives in one test

use crate::error::KdbWsError;
use crate::logger::initialize;

use std::path::PathBuf;

/// **VALUE**: Verifies the error path and the idempotence guard in one process.
///
/// **WHY THIS MATTERS**: A log file in a missing directory must exit with the log
/// file code instead of panicking, and a second call must never try to install
/// a second global logger.
///
/// **BUG THIS CATCHES**: Would catch if `fern::log_file()` errors are unwrapped, or if
/// the Once/AtomicBool guards are removed and fern fails on the second `apply()`.
#[test]
fn given_invalid_log_path_when_initialized_twice_then_errors_once_then_returns_ok() {
    // GIVEN: A path that cannot be created
    let invalid = PathBuf::from("/dev/null/kdbws/invalid.log");

    // WHEN: Initializing with it
    let first = initialize(Some(invalid.as_path()));

    // THEN: A LogFile error carrying its exit code
    let error = first.expect_err("log file in a missing directory");
    assert!(matches!(error, KdbWsError::LogFile { .. }));
    assert!(error.to_string().contains("invalid.log"));
    assert_eq!(error.exit_code(), 3);

    // WHEN: Calling again with no file
    let second = initialize(None);

    // THEN: The guard short-circuits
    assert!(second.is_ok(), "Second initialization should succeed");
}
