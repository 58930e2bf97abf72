//! PartHandler trait - Dispatcher output interface

use crate::Part;

/// Error raised by a caller-supplied handler
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// File part handler
///
/// Struct-based alternative to registering a closure. The handler owns the part
/// and is responsible for reading or discarding its stream.
#[trait_variant::make(PartHandler: Send)]
pub trait LocalPartHandler {
    /// Handler name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Consume one part
    ///
    /// # Errors
    /// Any error aborts the whole form processing
    async fn handle(&self, part: Part) -> Result<(), HandlerError>;
}
