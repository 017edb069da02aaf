//! Unified error handling for syredb-core

use thiserror::Error;

use crate::backend::BackendError;
use crate::forms::ValidationErrors;

/// Core error type for syredb-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for syredb-core
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an unknown action error
    pub fn unknown_action(tag: impl Into<String>) -> Self {
        Error::UnknownAction(tag.into())
    }

    /// Create an invalid action error
    pub fn invalid_action(msg: impl Into<String>) -> Self {
        Error::InvalidAction(msg.into())
    }

    /// Create a pipeline error
    pub fn pipeline(msg: impl Into<String>) -> Self {
        Error::Pipeline(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }
}

// Front-ends display errors as plain text
impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::unknown_action("set_theme");
        assert_eq!(err.to_string(), "Unknown action: set_theme");
    }

    #[test]
    fn test_backend_error_keeps_raw_message() {
        let err: Error = BackendError::new("connection refused").into();
        assert_eq!(err.to_string(), "Backend error: connection refused");
    }

    #[test]
    fn test_error_conversion_to_string() {
        let err = Error::pipeline("no form is shown");
        let s: String = err.into();
        assert!(s.contains("Pipeline error"));
    }
}
