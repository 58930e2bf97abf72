//! FormParser trait - Dispatcher input interface
//!
//! Decouples the dispatcher from the concrete boundary-parsing engine.

use std::future::Future;

use crate::{FlushState, FormEvent, MultipartConfig};

/// Multipart parsing engine
///
/// A parser is created from a consumable request source and yields [`FormEvent`]s
/// lazily. Nothing is read from the source before the first call to
/// [`FormParser::next_event`].
///
/// # Contract
///
/// 1. Events are yielded in body order; `Close` or `Error` ends the sequence
/// 2. After the sequence ends, `next_event` keeps returning `None`
/// 3. [`FormParser::flush_state`] counts the body itself as open until the terminal
///    boundary is read, plus one slot per emitted part until its stream ends
pub trait FormParser: Send + Sized + 'static {
    /// Request source the parser consumes
    type Source: Send + 'static;

    /// Create a parser over `source`
    fn start(source: Self::Source, config: &MultipartConfig) -> Self;

    /// Next event, `None` once the sequence has ended
    fn next_event(&mut self) -> impl Future<Output = Option<FormEvent>> + Send;

    /// Shared "still flushing" indicator
    fn flush_state(&self) -> FlushState;
}
