use crate::ErrorLocation;

use std::panic::Location;

/// **VALUE**: Verifies that `ErrorLocation` renders as `[file:line:column]`.
///
/// **WHY THIS MATTERS**: Every error in the workspace appends its location to the
/// message. Operators grep the process log for these markers when a relay dies.
///
/// **BUG THIS CATCHES**: Would catch a change to the Display format that drops
/// the brackets or one of the three coordinates.
#[test]
fn given_location_when_formatted_then_renders_file_line_column() {
    // GIVEN: A location captured here
    let location = ErrorLocation::from(Location::caller());

    // WHEN: Formatting it
    let rendered = location.to_string();

    // THEN: All three coordinates appear inside brackets
    assert!(rendered.starts_with('['));
    assert!(rendered.ends_with(']'));
    assert!(rendered.contains("error_location.rs"));
    assert!(rendered.contains(&format!(":{}:", location.line)));
}
