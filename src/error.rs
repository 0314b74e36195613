//! Centralized error handling module
//!
//! Provides the unified error taxonomy for the crate. Nothing here is fatal
//! to the process: catalog errors are row-scoped, retrieval errors are
//! feature-scoped, and extraction misses never become errors at all (they
//! surface as holes in the value series).

use thiserror::Error;

/// Application-wide error types
#[derive(Error, Debug)]
pub enum AppError {
    /// A malformed record, recovered locally by the component that saw it.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A feature references a resource kind with no registered strategy.
    #[error("Unsupported resource kind: {0}")]
    UnsupportedKind(String),

    /// Network or search failure against a data endpoint.
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// A response or input payload that could not be decoded.
    #[error("Malformed payload: {0}")]
    Malformed(String),

    /// Missing or unreadable runtime configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let error = AppError::UnsupportedKind("medication".to_string());
        assert_eq!(error.to_string(), "Unsupported resource kind: medication");

        let error = AppError::Retrieval("connection refused".to_string());
        assert!(error.to_string().starts_with("Retrieval error"));
    }

    #[test]
    fn test_validation_error_message() {
        let error = AppError::Validation("hba1c's code is empty".to_string());
        assert!(error.to_string().contains("hba1c"));
    }
}
