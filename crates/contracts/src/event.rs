//! FormEvent - parser output

use crate::{ParseError, Part};

/// Event produced by a multipart parsing engine, in body order
#[derive(Debug)]
pub enum FormEvent {
    /// A file part; its bytes are streamed through the [`Part`]
    Part(Part),

    /// A complete non-file field
    Field { key: String, value: String },

    /// The parser failed; no further events follow
    Error(ParseError),

    /// The terminal boundary was read
    Close,
}
