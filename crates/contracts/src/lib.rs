//! # Contracts
//!
//! Frozen interface contracts between the multipart dispatcher, the parsing
//! engines feeding it and the handlers consuming its parts.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Event Model
//! - A parser turns a request body into a lazy sequence of [`FormEvent`]s
//! - File parts arrive as [`Part`] byte streams, simple fields as key/value pairs
//! - [`FlushState`] reports how many byte streams the parser still has open

mod blueprint;
mod config;
mod error;
mod event;
mod handler;
mod parser;
mod part;

pub use blueprint::*;
pub use config::*;
pub use error::*;
pub use event::FormEvent;
pub use handler::{HandlerError, LocalPartHandler, PartHandler};
pub use parser::FormParser;
pub use part::{FlushGuard, FlushState, Part, PartBody};
