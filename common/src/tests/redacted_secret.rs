use crate::RedactedSecret;

/// **VALUE**: Verifies that neither `Debug` nor `Display` exposes the secret.
///
/// **WHY THIS MATTERS**: The bridge logs its parsed configuration at startup.
/// A credential that formats as itself ends up in the process log file.
///
/// **BUG THIS CATCHES**: Would catch someone replacing the manual impls with
/// `#[derive(Debug)]`.
#[test]
fn given_secret_when_formatted_then_value_is_hidden() {
    // GIVEN: A secret
    let secret = RedactedSecret::new("trader:hunter2");

    // WHEN: Formatting with Debug and Display
    let debug = format!("{secret:?}");
    let display = format!("{secret}");

    // THEN: Neither contains the value
    assert!(!debug.contains("hunter2"));
    assert!(!display.contains("hunter2"));
    assert_eq!(secret.expose(), "trader:hunter2");
}

/// **VALUE**: Verifies that empty CLI values are treated as "not configured".
///
/// **WHY THIS MATTERS**: Flags default to `""`. An empty credential must not turn
/// into an `Authorization` header or a kdb+ login attempt.
///
/// **BUG THIS CATCHES**: Would catch `non_empty` wrapping empty strings.
#[test]
fn given_empty_value_when_non_empty_called_then_returns_none() {
    // GIVEN/WHEN: Empty and non-empty inputs
    let empty = RedactedSecret::non_empty("");
    let present = RedactedSecret::non_empty("token");

    // THEN: Only the non-empty one is wrapped
    assert!(empty.is_none());
    assert_eq!(present.map(|s| s.len()), Some(5));
}

/// **VALUE**: Verifies that serializing a secret fails instead of leaking it.
///
/// **WHY THIS MATTERS**: Config structs may grow `Serialize` derives for
/// diagnostics. The secret must refuse to be part of that output.
///
/// **BUG THIS CATCHES**: Would catch a derived or pass-through `Serialize` impl.
#[test]
fn given_secret_when_serialized_then_returns_error() {
    // GIVEN: A secret
    let secret = RedactedSecret::new("hunter2");

    // WHEN: Serializing to JSON
    let result = serde_json::to_string(&secret);

    // THEN: Serialization fails
    assert!(result.is_err(), "Secrets must not serialize");
}
