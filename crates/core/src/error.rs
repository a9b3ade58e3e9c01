//! Error types for Augur.
//!
//! This module defines a unified error enum that covers all error categories
//! in the application: configuration, I/O, LLM providers, signatures, the
//! chat adapter and trace export.

use thiserror::Error;

/// Unified error type for Augur.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
/// Errors are propagated unmodified to `main`; nothing is retried.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors (transport, HTTP status, malformed responses)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Malformed signature strings
    #[error("Signature error: {0}")]
    Signature(String),

    /// Prompt formatting and completion parsing errors
    #[error("Adapter error: {0}")]
    Adapter(String),

    /// Trace export registration errors
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::Signature("missing '->'".to_string());
        assert_eq!(err.to_string(), "Signature error: missing '->'");
    }

    #[test]
    fn test_from_serde_json() {
        let err: AppError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
