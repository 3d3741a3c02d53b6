//! Pass/fail heuristic over a step's exit code and captured output.
//!
//! A runner that exits 0 without printing any marker is reported as passed
//! even if it silently skipped work; text that happens to contain a marker is
//! reported as failed.

/// Case-sensitive substrings that mark a failed run regardless of exit code.
pub const FAILURE_MARKERS: [&str; 5] = ["FAILED", "FAIL:", "ERROR:", "Traceback", "AssertionError"];

#[must_use]
pub fn is_failure(return_code: i32, output: &str) -> bool {
    return_code != 0 || contains_marker(output)
}

#[must_use]
pub fn contains_marker(text: &str) -> bool {
    FAILURE_MARKERS.iter().any(|marker| text.contains(marker))
}

/// Output lines containing at least one failure marker, in output order.
#[must_use]
pub fn failure_lines(output: &str) -> Vec<&str> {
    output.split('\n').filter(|line| contains_marker(line)).collect()
}
