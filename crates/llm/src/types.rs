//! LLM Types
//!
//! Request/response types, token usage accounting, the usage-reporting
//! sink, and the error taxonomy shared by all providers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role of a chat message sent to a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message in a provider request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A text or object generation request
#[derive(Debug, Clone, Default)]
pub struct LlmRequest {
    /// Conversation history, oldest first
    pub messages: Vec<ChatMessage>,
    /// Optional system prompt, prepended to the message list
    pub system: Option<String>,
    /// Sampling temperature; provider default when None
    pub temperature: Option<f64>,
    /// Output token cap; provider default when None
    pub max_tokens: Option<u32>,
}

impl LlmRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Token usage reported by a provider for one call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
        }
    }
}

/// Completed text generation
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub usage: TokenUsage,
    /// Model identifier, used only for telemetry tagging
    pub model_id: String,
}

/// Completed schema-constrained object generation
#[derive(Debug, Clone)]
pub struct ObjectResponse {
    pub value: serde_json::Value,
    pub usage: TokenUsage,
    pub model_id: String,
}

/// One usage record handed to a `UsageReporter`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageEvent {
    /// Provider name ("openai-compat", ...)
    pub provider: String,
    /// Model identifier
    pub model_id: String,
    /// What the call was for ("fallback_consent_question", "ai_review", ...)
    pub label: String,
    pub usage: TokenUsage,
}

/// Sink for token-usage events, consumed by an external billing/tracking
/// collaborator.
///
/// The dependency is explicit in function signatures rather than an
/// optional callback. Reporting is best-effort: implementations must not
/// fail the calling turn, and callers never branch on the outcome.
pub trait UsageReporter: Send + Sync {
    fn report(&self, event: &UsageEvent);
}

/// Reporter that drops every event. Default when no billing collaborator
/// is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullUsageReporter;

impl UsageReporter for NullUsageReporter {
    fn report(&self, _event: &UsageEvent) {}
}

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key; empty means unauthenticated (local inference)
    pub api_key: String,
    /// Base URL override; provider default when None
    pub base_url: Option<String>,
    /// Model identifier
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Default sampling temperature
    pub temperature: f64,
    /// Default output token cap
    pub max_tokens: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: None,
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 30,
            temperature: 0.7,
            max_tokens: 1024,
        }
    }
}

/// Errors from LLM provider calls
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<u64>,
    },

    #[error("Model not found: {model}")]
    ModelNotFound { model: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Server error ({status:?}): {message}")]
    ServerError {
        message: String,
        status: Option<u16>,
    },

    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("LLM error: {message}")]
    Other { message: String },
}

/// Result type alias for provider calls
pub type LlmResult<T> = Result<T, LlmError>;
