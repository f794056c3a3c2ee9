//! Shared guardrails for user input and fixture geometry bounds.

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// Longest manual-entry buffer kept; longer input is cut at a char boundary.
pub const MAX_CODE_INPUT_LENGTH: usize = 64;
pub const DEFAULT_LAYOUT_CACHE_SIZE: usize = 64;

#[cfg_attr(feature = "python", pyfunction)]
pub fn clamp_int(value: i64, minimum: i64, maximum: i64) -> i64 {
    value.max(minimum).min(maximum)
}

/// Number of sides offered for navigation on a fixture declaring `sides`;
/// every fixture has at least one face.
#[cfg_attr(feature = "python", pyfunction)]
pub fn navigable_sides(sides: i64) -> i64 {
    sides.max(1)
}

/// Whether `side` is a selectable face of a fixture with `sides` faces.
#[cfg_attr(feature = "python", pyfunction)]
pub fn side_in_range(side: i64, sides: i64) -> bool {
    (1..=navigable_sides(sides)).contains(&side)
}

#[cfg_attr(feature = "python", pyfunction)]
pub fn truncate_code_input(input: &str) -> String {
    if input.len() <= MAX_CODE_INPUT_LENGTH {
        return input.to_string();
    }
    let mut end = MAX_CODE_INPUT_LENGTH;
    while !input.is_char_boundary(end) {
        end -= 1;
    }
    input[..end].to_string()
}
