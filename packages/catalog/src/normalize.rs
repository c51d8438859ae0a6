//! Join-key normalization.
//!
//! Applied symmetrically to region names and table keys at join time so
//! `" Centro "` and `"CENTRO"` match. Source attributes are never
//! rewritten.

/// Trims surrounding whitespace and uppercases.
#[must_use]
pub fn normalize_key(input: &str) -> String {
    input.trim().to_uppercase()
}
