//! LLM Provider Trait
//!
//! Defines the common interface for text and schema-constrained object
//! generation. The engine treats providers as an opaque capability with a
//! model identifier used only for telemetry tagging.

use async_trait::async_trait;

use super::types::{LlmError, LlmRequest, LlmResponse, LlmResult, ObjectResponse};

/// Trait that all LLM providers must implement.
///
/// Provides a unified interface for:
/// - Free-form text completions (generate_text)
/// - Schema-constrained JSON object generation (generate_object)
/// - Health checking
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider name for identification.
    fn name(&self) -> &'static str;

    /// Returns the current model being used.
    fn model(&self) -> &str;

    /// Generate a free-form text completion.
    async fn generate_text(&self, request: LlmRequest) -> LlmResult<LlmResponse>;

    /// Generate a JSON object constrained by the given JSON schema.
    ///
    /// Implementations must return a value that parses as JSON; schema
    /// conformance of individual fields is the caller's concern (callers
    /// deserialize into their target type and fall back on failure).
    async fn generate_object(
        &self,
        request: LlmRequest,
        schema: &serde_json::Value,
    ) -> LlmResult<ObjectResponse>;

    /// Check if the provider is healthy and reachable.
    ///
    /// For API providers, this validates the API key.
    async fn health_check(&self) -> LlmResult<()>;
}

/// Helper function to create an error for missing API key
pub fn missing_api_key_error(provider: &str) -> LlmError {
    LlmError::AuthenticationFailed {
        message: format!("API key not configured for {}", provider),
    }
}

/// Helper function to parse HTTP error status codes
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> LlmError {
    match status {
        401 => LlmError::AuthenticationFailed {
            message: format!("{}: Invalid API key", provider),
        },
        403 => LlmError::AuthenticationFailed {
            message: format!("{}: Access denied", provider),
        },
        404 => LlmError::ModelNotFound {
            model: body.to_string(),
        },
        429 => LlmError::RateLimited {
            message: body.to_string(),
            retry_after: None,
        },
        400 => LlmError::InvalidRequest {
            message: body.to_string(),
        },
        500..=599 => LlmError::ServerError {
            message: body.to_string(),
            status: Some(status),
        },
        _ => LlmError::Other {
            message: format!("HTTP {}: {}", status, body),
        },
    }
}
