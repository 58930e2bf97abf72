//! Layered error definitions
//!
//! Categorized by source: config / parse

use thiserror::Error;

/// Configuration and general contract errors
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors reported by a multipart parsing engine
#[derive(Debug, Error)]
pub enum ParseError {
    /// More parts than `max_fields` were submitted
    #[error("maxFields {limit} exceeded")]
    FieldsLimitExceeded { limit: usize },

    /// Field values exceeded `max_fields_size` bytes in total
    #[error("maxFieldsSize {limit} exceeded")]
    FieldsSizeExceeded { limit: usize },

    /// The body does not follow the multipart grammar
    #[error("malformed multipart body: {message}")]
    Malformed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Reading the request body failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ParseError {
    /// Create a malformed-body error without an underlying cause
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
            source: None,
        }
    }

    /// Whether this error reports a configured size or count limit
    pub fn is_limit_exceeded(&self) -> bool {
        matches!(
            self,
            Self::FieldsLimitExceeded { .. } | Self::FieldsSizeExceeded { .. }
        )
    }
}
