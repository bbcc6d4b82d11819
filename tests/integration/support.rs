//! Scripted LLM provider for integration tests.
//!
//! Returns queued responses in order and counts calls, so tests can
//! assert both the pipeline's output and how many generations it spent.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use interview_llm::{
    LlmError, LlmProvider, LlmRequest, LlmResponse, LlmResult, ObjectResponse, TokenUsage,
};

pub struct ScriptedProvider {
    text_responses: Mutex<VecDeque<LlmResult<String>>>,
    object_responses: Mutex<VecDeque<LlmResult<serde_json::Value>>>,
    pub text_calls: AtomicUsize,
    pub object_calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            text_responses: Mutex::new(VecDeque::new()),
            object_responses: Mutex::new(VecDeque::new()),
            text_calls: AtomicUsize::new(0),
            object_calls: AtomicUsize::new(0),
        }
    }

    pub fn push_text(&self, content: &str) {
        self.text_responses
            .lock()
            .unwrap()
            .push_back(Ok(content.to_string()));
    }

    pub fn push_text_error(&self) {
        self.text_responses
            .lock()
            .unwrap()
            .push_back(Err(LlmError::Timeout { seconds: 30 }));
    }

    pub fn push_object(&self, value: serde_json::Value) {
        self.object_responses.lock().unwrap().push_back(Ok(value));
    }

    pub fn text_call_count(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }

    pub fn object_call_count(&self) -> usize {
        self.object_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn generate_text(&self, _request: LlmRequest) -> LlmResult<LlmResponse> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .text_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::Other {
                message: "no scripted response left".to_string(),
            }));
        next.map(|content| LlmResponse {
            content,
            usage: TokenUsage::new(100, 20),
            model_id: "scripted-model".to_string(),
        })
    }

    async fn generate_object(
        &self,
        _request: LlmRequest,
        _schema: &serde_json::Value,
    ) -> LlmResult<ObjectResponse> {
        self.object_calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .object_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::Other {
                message: "no scripted object left".to_string(),
            }));
        next.map(|value| ObjectResponse {
            value,
            usage: TokenUsage::new(50, 10),
            model_id: "scripted-model".to_string(),
        })
    }

    async fn health_check(&self) -> LlmResult<()> {
        Ok(())
    }
}
