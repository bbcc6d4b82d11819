//! Interview LLM
//!
//! Provider abstraction for the interview conversation engine. The engine
//! treats the LLM as a black-box text/object generation capability with a
//! usage-reporting side channel; this crate defines that boundary:
//!
//! - `LlmProvider` trait (text + schema-constrained object generation)
//! - `UsageReporter` sink for token accounting
//! - An OpenAI-compatible HTTP provider and the HTTP client factory

pub mod http_client;
pub mod openai_compat;
pub mod provider;
pub mod types;

// Re-export main types
pub use http_client::build_http_client;
pub use openai_compat::OpenAiCompatProvider;
pub use provider::{missing_api_key_error, parse_http_error, LlmProvider};
pub use types::{
    ChatMessage, ChatRole, LlmError, LlmRequest, LlmResponse, LlmResult, NullUsageReporter,
    ObjectResponse, ProviderConfig, TokenUsage, UsageEvent, UsageReporter,
};
