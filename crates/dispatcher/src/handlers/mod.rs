//! Built-in file handlers
//!
//! Contains LogHandler and DiskHandler.

mod disk;
mod log;

pub use self::disk::{DiskHandler, DiskHandlerConfig};
pub use self::log::LogHandler;
