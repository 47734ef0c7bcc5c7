//! Suite allow-list check for expected-failure markers.

/// Whether a marker with `allow_list` applies to a case declared in
/// `current_suite`. An empty list applies everywhere.
#[must_use]
pub fn is_in_scope(allow_list: &[String], current_suite: &str) -> bool {
    allow_list.is_empty() || allow_list.iter().any(|suite| suite == current_suite)
}
