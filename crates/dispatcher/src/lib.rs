//! # Dispatcher
//!
//! Streaming dispatcher for `multipart/form-data` bodies.
//!
//! Responsibilities:
//! - Route each file part to a handler registered by name, or to the `"*"` wildcard
//! - Drain parts nobody asked for so the body keeps flowing
//! - Settle exactly once, after the parser has flushed every part and every
//!   handler has returned
//!
//! ```ignore
//! let mut dispatcher = Dispatcher::<MulterParser>::new(source, MultipartConfig::default());
//! dispatcher
//!     .on_file("avatar", |part| async move {
//!         let bytes = part.bytes().await?;
//!         store(bytes).await
//!     })
//!     .on_field("*", |key, value| {
//!         tracing::info!(key, value, "field");
//!         Ok(())
//!     });
//! dispatcher.process().await?;
//! ```

pub mod builder;
pub mod completion;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod name;
pub mod registry;
pub mod router;

pub use builder::{DispatcherBuilder, FieldCollector};
pub use completion::{CompletionState, CompletionTracker};
pub use contracts::{FormParser, HandlerError, MultipartConfig, Part, PartHandler};
pub use dispatcher::Dispatcher;
pub use error::DispatchError;
pub use handlers::{DiskHandler, DiskHandlerConfig, LogHandler};
pub use metrics::{DispatchMetrics, MetricsSnapshot};
pub use name::handler_name;
pub use registry::{FieldHandler, FileHandler, HandlerRegistry, Route, WILDCARD};
pub use router::{DrainReason, RouteOutcome, RouteResult};
