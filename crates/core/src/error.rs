//! Core Error Types
//!
//! Defines the foundational error types used across the interview engine
//! workspace. These error types are dependency-free (only thiserror + serde)
//! to keep the core crate lightweight.
//!
//! The engine crate extends these with additional error variants
//! (e.g., Database, Llm) that require heavier dependencies.

use thiserror::Error;

/// Core error type for the interview engine workspace.
///
/// This is the minimal error set that the core crate needs. The engine
/// crate defines additional variants for storage, LLM calls, etc.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration errors (bot/topic setup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Parse errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Convert CoreError to a string
impl From<CoreError> for String {
    fn from(err: CoreError) -> String {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::config("missing topic list");
        assert_eq!(err.to_string(), "Configuration error: missing topic list");
    }

    #[test]
    fn test_error_conversion() {
        let err = CoreError::validation("max_turns below min_turns");
        let msg: String = err.into();
        assert!(msg.contains("Validation error"));
    }

    #[test]
    fn test_not_found_error() {
        let err = CoreError::not_found("Topic not found: retention");
        assert_eq!(err.to_string(), "Not found: Topic not found: retention");
    }
}
