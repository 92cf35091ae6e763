use relay_core::error::{FatalError, KdbError};

use common::ErrorLocation;

use std::error::Error;
use std::panic::Location;

/// **VALUE**: Verifies that `KdbError::Decode` includes file/line/column location tracking.
///
/// **WHY THIS MATTERS**: A decode failure ends the process. The log line has to say
/// where the bad bytes were detected, not just that something went wrong.
///
/// **BUG THIS CATCHES**: Would catch if someone:
/// - Removes the `location` field from KdbError
/// - Breaks the Display implementation to not include location
#[test]
#[track_caller]
fn given_decode_error_when_formatted_then_includes_location() {
    // GIVEN: A Decode error with location
    let err = KdbError::Decode {
        message: "unsupported type 100".to_string(),
        location: ErrorLocation::from(Location::caller()),
    };

    // WHEN: Formatting the error as string
    let error_string = format!("{}", err);

    // THEN: Should include error type, message, and file location
    assert!(error_string.contains("Decode Error"));
    assert!(error_string.contains("unsupported type 100"));
    assert!(error_string.contains("kdb.rs"));
}

/// **VALUE**: Verifies the fatal read error keeps the underlying kdb+ error as its source.
///
/// **BUG THIS CATCHES**: A `#[source]` attribute dropped from FatalError, which would
/// hide the root cause from anything walking the error chain.
#[test]
fn given_kdb_read_failure_when_wrapped_then_source_is_kdb_error() {
    // GIVEN
    let err = FatalError::KdbRead(KdbError::Closed {
        message: "kdb+ process closed the connection".to_string(),
        location: ErrorLocation::from(Location::caller()),
    });

    // WHEN
    let source = err.source().expect("FatalError should expose its source");

    // THEN
    assert!(source.to_string().contains("Connection Closed Error"));
    assert!(err.to_string().starts_with("Error reading from kdb+ handle"));
}

/// **VALUE**: Verifies end-of-stream maps to `Closed`, other IO errors to `Io`.
#[test]
fn given_io_errors_when_converted_then_eof_is_closed() {
    use std::io::{Error as IoError, ErrorKind};

    let eof = KdbError::from(IoError::new(ErrorKind::UnexpectedEof, "eof"));
    let reset = KdbError::from(IoError::new(ErrorKind::ConnectionReset, "reset"));

    assert!(matches!(eof, KdbError::Closed { .. }));
    assert!(matches!(reset, KdbError::Io { .. }));
}
