use relay_core::callback::CallbackKind;
use relay_core::error::{CallbackError, FatalError, KdbError};

use common::ErrorLocation;

use std::panic::Location;

/// **VALUE**: Verifies callback failures name the callback in their message.
///
/// **WHY THIS MATTERS**: Each callback has its own exit code, and the log line is the
/// only other place that says which write failed.
#[test]
fn given_callback_error_when_formatted_then_names_kind_and_cause() {
    // GIVEN
    let err = CallbackError {
        kind: CallbackKind::Close,
        source: KdbError::Io {
            message: "broken pipe".to_string(),
            location: ErrorLocation::from(Location::caller()),
        },
    };

    // WHEN
    let fatal = FatalError::from(err);

    // THEN
    let error_string = fatal.to_string();
    assert!(error_string.contains("Close callback"));
    assert!(error_string.contains("broken pipe"));
}
