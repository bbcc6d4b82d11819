//! OpenAI-Compatible Provider
//!
//! Implementation of the LlmProvider trait against the OpenAI
//! chat-completions wire format, which most hosted and local inference
//! servers also speak. Object generation uses JSON mode with the target
//! schema embedded in the system prompt, plus one repair retry when the
//! returned text does not parse as JSON.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::http_client::build_http_client;
use super::provider::{missing_api_key_error, parse_http_error, LlmProvider};
use super::types::{
    ChatRole, LlmError, LlmRequest, LlmResponse, LlmResult, ObjectResponse, ProviderConfig,
    TokenUsage,
};

/// Default OpenAI API base URL
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Provider speaking the OpenAI chat-completions dialect
pub struct OpenAiCompatProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

impl OpenAiCompatProvider {
    /// Create a new provider with the given configuration
    pub fn new(config: ProviderConfig) -> Self {
        let client = build_http_client(config.timeout_secs);
        Self { config, client }
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(OPENAI_BASE_URL)
            .trim_end_matches('/')
    }

    fn build_request_body(&self, request: &LlmRequest, json_mode: bool) -> serde_json::Value {
        let mut messages: Vec<serde_json::Value> = Vec::new();

        if let Some(ref system) = request.system {
            messages.push(serde_json::json!({ "role": "system", "content": system }));
        }

        for msg in &request.messages {
            let role = match msg.role {
                ChatRole::System => "system",
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            };
            messages.push(serde_json::json!({ "role": role, "content": msg.content }));
        }

        let mut body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": request.temperature.unwrap_or(self.config.temperature),
            "max_tokens": request.max_tokens.unwrap_or(self.config.max_tokens),
        });

        if json_mode {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        body
    }

    async fn post_chat(&self, body: serde_json::Value) -> LlmResult<(String, TokenUsage, String)> {
        if self.config.api_key.is_empty() && self.config.base_url.is_none() {
            return Err(missing_api_key_error(self.name()));
        }

        let url = format!("{}/chat/completions", self.base_url());
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| LlmError::Network {
            message: e.to_string(),
        })?;

        if !(200..300).contains(&status) {
            return Err(parse_http_error(status, &text, self.name()));
        }

        let parsed: ApiResponse =
            serde_json::from_str(&text).map_err(|e| LlmError::InvalidResponse {
                message: format!("Malformed completion payload: {}", e),
            })?;

        let content = parsed
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| LlmError::InvalidResponse {
                message: "Completion contained no choices".to_string(),
            })?;

        let usage = parsed
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        let model_id = parsed.model.unwrap_or_else(|| self.config.model.clone());

        Ok((content, usage, model_id))
    }

    fn map_transport_error(&self, err: reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout {
                seconds: self.config.timeout_secs,
            }
        } else {
            LlmError::Network {
                message: err.to_string(),
            }
        }
    }
}

/// Strip markdown code fences some models wrap around JSON-mode output
fn strip_json_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open.strip_suffix("```").unwrap_or(without_open).trim()
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &'static str {
        "openai-compat"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate_text(&self, request: LlmRequest) -> LlmResult<LlmResponse> {
        let body = self.build_request_body(&request, false);
        let (content, usage, model_id) = self.post_chat(body).await?;
        Ok(LlmResponse {
            content,
            usage,
            model_id,
        })
    }

    async fn generate_object(
        &self,
        request: LlmRequest,
        schema: &serde_json::Value,
    ) -> LlmResult<ObjectResponse> {
        let schema_instruction = format!(
            "Respond with a single JSON object and nothing else. \
             It must conform to this JSON schema:\n{}",
            serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string())
        );

        let mut constrained = request;
        constrained.system = Some(match constrained.system.take() {
            Some(system) => format!("{}\n\n{}", system, schema_instruction),
            None => schema_instruction,
        });

        let body = self.build_request_body(&constrained, true);
        let (content, mut usage, model_id) = self.post_chat(body.clone()).await?;

        match serde_json::from_str::<serde_json::Value>(strip_json_fences(&content)) {
            Ok(value) => Ok(ObjectResponse {
                value,
                usage,
                model_id,
            }),
            Err(parse_err) => {
                // One repair round: feed the broken output back and ask again
                debug!(error = %parse_err, "JSON-mode output failed to parse, retrying once");
                let mut repair = body;
                if let Some(messages) = repair["messages"].as_array_mut() {
                    messages.push(serde_json::json!({
                        "role": "assistant", "content": content
                    }));
                    messages.push(serde_json::json!({
                        "role": "user",
                        "content": "That was not valid JSON. Reply again with only the JSON object."
                    }));
                }
                let (retry_content, retry_usage, model_id) = self.post_chat(repair).await?;
                usage = TokenUsage::new(
                    usage.input_tokens + retry_usage.input_tokens,
                    usage.output_tokens + retry_usage.output_tokens,
                );
                let value = serde_json::from_str(strip_json_fences(&retry_content)).map_err(
                    |e| LlmError::InvalidResponse {
                        message: format!("Object generation returned invalid JSON twice: {}", e),
                    },
                )?;
                Ok(ObjectResponse {
                    value,
                    usage,
                    model_id,
                })
            }
        }
    }

    async fn health_check(&self) -> LlmResult<()> {
        let url = format!("{}/models", self.base_url());
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status().as_u16();
        if (200..300).contains(&status) {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(parse_http_error(status, &body, self.name()))
        }
    }
}
