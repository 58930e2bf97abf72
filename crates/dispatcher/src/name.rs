//! Part name normalization

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

/// First `[<ASCII digits>]` or `[]` group in a part name
static ARRAY_INDEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[0-9]*\]").expect("array index regex should be valid"));

/// Name used to look up the handler for a raw part name
///
/// Removes the first array-index group only: `files[0]`, `files[12]` and `files[]`
/// all map to `files`, while `grid[0][1]` maps to `grid[1]`.
pub fn handler_name(raw: &str) -> Cow<'_, str> {
    ARRAY_INDEX.replace(raw, "")
}
