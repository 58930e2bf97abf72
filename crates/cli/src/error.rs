//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Body file not found
    #[error("Body file not found: {path}")]
    BodyNotFound { path: String },

    /// No multipart boundary could be determined
    #[error("Cannot determine multipart boundary: {message}")]
    Boundary { message: String },

    /// Dispatch failed
    #[error("Dispatch failed ({code}, status {status}): {message}")]
    Dispatch {
        code: &'static str,
        status: u16,
        message: String,
    },

    /// Dispatch did not settle in time
    #[error("Dispatch timed out after {secs}s")]
    Timeout { secs: u64 },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn body_not_found(path: impl Into<String>) -> Self {
        Self::BodyNotFound { path: path.into() }
    }

    pub fn boundary(message: impl Into<String>) -> Self {
        Self::Boundary {
            message: message.into(),
        }
    }
}

impl From<dispatcher::DispatchError> for CliError {
    fn from(error: dispatcher::DispatchError) -> Self {
        Self::Dispatch {
            code: error.code(),
            status: error.status_code(),
            message: error.to_string(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
