//! # Form Parser
//!
//! Parsing engines implementing [`contracts::FormParser`].
//!
//! - [`MulterParser`]: RFC 7578 boundary parser backed by `multer`
//! - [`ScriptedParser`]: deterministic event script for tests without a real body
//!
//! Both enforce `max_fields` (a file counts as a field) and `max_fields_size`, and
//! keep the request body counted in their [`contracts::FlushState`] until the
//! terminal boundary is reached.

mod limits;
mod mock;
mod multer_parser;

pub use contracts::{FormEvent, FormParser, MultipartConfig};
pub use mock::{FormScript, ScriptProbe, ScriptStep, ScriptedParser};
pub use multer_parser::{MulterParser, MulterSource};
