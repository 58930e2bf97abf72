//! Dispatcher error types

use contracts::{HandlerError, ParseError};
use thiserror::Error;

/// Failure of [`crate::Dispatcher::process`]
#[derive(Debug, Error)]
pub enum DispatchError {
    /// `process` was called more than once
    #[error("multipart stream has already been consumed")]
    AlreadyConsumed,

    /// A configured field count or size limit was exceeded
    #[error("max fields limit exceeded: {source}")]
    EntityTooLarge {
        #[source]
        source: ParseError,
    },

    /// A file or field handler failed; displays the handler's own message
    #[error("{source}")]
    Handler {
        /// Name of the part or field being handled
        name: String,
        #[source]
        source: HandlerError,
    },

    /// Any other parser failure
    #[error(transparent)]
    Parser(ParseError),

    /// A built-in handler could not be created from its route config
    #[error("failed to create handler '{name}': {message}")]
    HandlerCreation { name: String, message: String },
}

impl DispatchError {
    /// Create a handler error
    pub fn handler(name: impl Into<String>, source: HandlerError) -> Self {
        Self::Handler {
            name: name.into(),
            source,
        }
    }

    /// Create a handler creation error
    pub fn handler_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::HandlerCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// HTTP status code hint for the failure
    pub fn status_code(&self) -> u16 {
        match self {
            Self::AlreadyConsumed => 500,
            Self::EntityTooLarge { .. } => 413,
            Self::Handler { .. } => 500,
            Self::Parser(_) => 400,
            Self::HandlerCreation { .. } => 500,
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyConsumed => "E_RUNTIME_EXCEPTION",
            Self::EntityTooLarge { .. } => "E_REQUEST_ENTITY_TOO_LARGE",
            Self::Handler { .. } => "E_HANDLER_FAILED",
            Self::Parser(_) => "E_MULTIPART_PARSE",
            Self::HandlerCreation { .. } => "E_HANDLER_CREATION",
        }
    }

    /// The handler's error, if this failure came from a handler
    pub fn handler_error(&self) -> Option<&HandlerError> {
        match self {
            Self::Handler { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Take the handler's error out, if this failure came from a handler
    pub fn into_handler_error(self) -> Option<HandlerError> {
        match self {
            Self::Handler { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ParseError> for DispatchError {
    fn from(error: ParseError) -> Self {
        if error.is_limit_exceeded() {
            Self::EntityTooLarge { source: error }
        } else {
            Self::Parser(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_errors_become_entity_too_large() {
        let err = DispatchError::from(ParseError::FieldsLimitExceeded { limit: 5 });
        assert!(matches!(err, DispatchError::EntityTooLarge { .. }));
        assert_eq!(err.status_code(), 413);
        assert_eq!(err.code(), "E_REQUEST_ENTITY_TOO_LARGE");
    }

    #[test]
    fn test_other_parse_errors_pass_through() {
        let err = DispatchError::from(ParseError::malformed("missing boundary"));
        assert!(matches!(err, DispatchError::Parser(_)));
        assert_eq!(err.to_string(), "malformed multipart body: missing boundary");
    }

    #[test]
    fn test_handler_error_keeps_message() {
        let err = DispatchError::handler("avatar", "disk full".into());
        assert_eq!(err.to_string(), "disk full");
        assert_eq!(err.handler_error().unwrap().to_string(), "disk full");
    }
}
