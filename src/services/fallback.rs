//! Deterministic Fallback Question Generators
//!
//! When free-form generation fails the quality gate, the engine switches
//! to a narrow schema-constrained generation that can only emit a single
//! question. Even that call is fallible, so each generator bottoms out in
//! a static per-language template: the functions here never error and the
//! user always receives exactly one question.
//!
//! Token usage from the constrained calls is pushed through the injected
//! `UsageReporter`; reporting is best-effort and decoupled from the
//! returned text.

use schemars::{schema_for, JsonSchema};
use serde::Deserialize;
use tracing::warn;

use interview_core::Language;
use interview_llm::{ChatMessage, LlmProvider, LlmRequest, UsageEvent, UsageReporter};

use crate::models::FieldSpec;

/// Output cap for the constrained calls; one question needs no more
const FALLBACK_MAX_TOKENS: u32 = 120;

/// Schema target for the constrained generation
#[derive(Debug, Deserialize, JsonSchema)]
struct SingleQuestion {
    /// Exactly one interview question, ending with a question mark
    question: String,
}

/// Ask the consent question, and nothing else.
///
/// Total: a failed or malformed constrained call degrades to the static
/// per-language template.
pub async fn generate_consent_question_only(
    provider: &dyn LlmProvider,
    reporter: &dyn UsageReporter,
    language: Language,
    objective: &str,
) -> String {
    let system = match language {
        Language::Italian => {
            "Sei un intervistatore. Genera UNA sola domanda di consenso sì/no, in italiano, \
             che chieda all'utente se acconsente alla conservazione delle sue risposte. \
             Nessun preambolo, nessuna seconda domanda."
        }
        Language::English => {
            "You are an interviewer. Generate exactly ONE yes/no consent question, in English, \
             asking the user whether they agree to their answers being stored. \
             No preamble, no second question."
        }
    };
    let user = format!("Interview objective: {}", objective);

    match generate_question(provider, reporter, system, &user, "fallback_consent_question").await {
        Some(question) => question,
        None => consent_template(language).to_string(),
    }
}

/// Ask for one missing required field, and nothing else
pub async fn generate_field_question_only(
    provider: &dyn LlmProvider,
    reporter: &dyn UsageReporter,
    language: Language,
    field: &FieldSpec,
) -> String {
    let system = match language {
        Language::Italian => {
            "Sei un intervistatore. Genera UNA sola domanda, in italiano, che chieda \
             all'utente il dato indicato. Nessun preambolo, nessuna seconda domanda."
        }
        Language::English => {
            "You are an interviewer. Generate exactly ONE question, in English, asking the \
             user for the indicated piece of information. No preamble, no second question."
        }
    };
    let user = format!("Information to collect: {}", field.label);

    match generate_question(provider, reporter, system, &user, "fallback_field_question").await {
        Some(question) => question,
        None => field_template(language, field),
    }
}

async fn generate_question(
    provider: &dyn LlmProvider,
    reporter: &dyn UsageReporter,
    system: &str,
    user: &str,
    label: &str,
) -> Option<String> {
    let schema = match serde_json::to_value(schema_for!(SingleQuestion)) {
        Ok(schema) => schema,
        Err(e) => {
            warn!(error = %e, "Failed to serialize fallback question schema");
            return None;
        }
    };

    let request = LlmRequest::new(vec![ChatMessage::user(user)])
        .with_system(system)
        .with_temperature(0.3)
        .with_max_tokens(FALLBACK_MAX_TOKENS);

    match provider.generate_object(request, &schema).await {
        Ok(response) => {
            reporter.report(&UsageEvent {
                provider: provider.name().to_string(),
                model_id: response.model_id.clone(),
                label: label.to_string(),
                usage: response.usage,
            });
            match serde_json::from_value::<SingleQuestion>(response.value) {
                Ok(parsed) if !parsed.question.trim().is_empty() => {
                    Some(normalize_single_question(&parsed.question))
                }
                Ok(_) => None,
                Err(e) => {
                    warn!(error = %e, label, "Constrained generation returned wrong shape");
                    None
                }
            }
        }
        Err(e) => {
            warn!(error = %e, label, "Constrained generation failed, using template");
            None
        }
    }
}

fn consent_template(language: Language) -> &'static str {
    match language {
        Language::Italian => {
            "Prima di concludere: acconsenti a farci conservare le tue risposte per questa ricerca?"
        }
        Language::English => {
            "Before we finish: do you agree to your answers being stored for this research?"
        }
    }
}

fn field_template(language: Language, field: &FieldSpec) -> String {
    match language {
        Language::Italian => format!("Potresti indicarmi {}?", field.label),
        Language::English => format!("Could you share {}?", field.label),
    }
}

/// Force the text into the shape "one question, one question mark".
///
/// Collapses everything after the first `?` and force-appends `?` when
/// missing. The result always ends with exactly one `?` and contains at
/// most one.
pub fn normalize_single_question(text: &str) -> String {
    let trimmed = text.trim();
    if let Some(pos) = trimmed.find('?') {
        return trimmed[..=pos].trim().to_string();
    }
    let base = trimmed.trim_end_matches(['.', '!', ',', ';', ':']).trim_end();
    format!("{}?", base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use interview_llm::{
        LlmError, LlmResponse, LlmResult, NullUsageReporter, ObjectResponse, TokenUsage,
    };
    use std::sync::Mutex;

    struct StubProvider {
        object_result: Mutex<Option<LlmResult<ObjectResponse>>>,
    }

    impl StubProvider {
        fn returning(value: serde_json::Value) -> Self {
            Self {
                object_result: Mutex::new(Some(Ok(ObjectResponse {
                    value,
                    usage: TokenUsage::new(10, 5),
                    model_id: "stub-model".to_string(),
                }))),
            }
        }

        fn failing() -> Self {
            Self {
                object_result: Mutex::new(Some(Err(LlmError::Timeout { seconds: 30 }))),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for StubProvider {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn model(&self) -> &str {
            "stub-model"
        }

        async fn generate_text(&self, _request: LlmRequest) -> LlmResult<LlmResponse> {
            Err(LlmError::Other {
                message: "not used".to_string(),
            })
        }

        async fn generate_object(
            &self,
            _request: LlmRequest,
            _schema: &serde_json::Value,
        ) -> LlmResult<ObjectResponse> {
            self.object_result
                .lock()
                .unwrap()
                .take()
                .expect("single call expected")
        }

        async fn health_check(&self) -> LlmResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_normalize_collapses_to_first_question_mark() {
        assert_eq!(
            normalize_single_question("May I save your answers? Also, what is your email?"),
            "May I save your answers?"
        );
    }

    #[test]
    fn test_normalize_appends_missing_question_mark() {
        assert_eq!(
            normalize_single_question("Tell me your email."),
            "Tell me your email?"
        );
        assert_eq!(normalize_single_question("  ready  "), "ready?");
    }

    #[test]
    fn test_normalize_result_shape() {
        for input in ["a? b? c?", "no mark", "trailing!!!", "x?"] {
            let out = normalize_single_question(input);
            assert_eq!(out.matches('?').count(), 1);
            assert!(out.ends_with('?'));
        }
    }

    #[tokio::test]
    async fn test_consent_question_from_constrained_call() {
        let provider = StubProvider::returning(serde_json::json!({
            "question": "Do you agree to us keeping your answers? Thanks!"
        }));
        let question = generate_consent_question_only(
            &provider,
            &NullUsageReporter,
            Language::English,
            "Understand churn drivers",
        )
        .await;
        assert_eq!(question, "Do you agree to us keeping your answers?");
    }

    #[tokio::test]
    async fn test_consent_template_on_provider_failure() {
        let provider = StubProvider::failing();
        let question = generate_consent_question_only(
            &provider,
            &NullUsageReporter,
            Language::Italian,
            "Capire i motivi di abbandono",
        )
        .await;
        assert!(question.starts_with("Prima di concludere"));
        assert!(question.ends_with('?'));
    }

    #[tokio::test]
    async fn test_field_template_on_wrong_shape() {
        let provider = StubProvider::returning(serde_json::json!({ "prompt": "nope" }));
        let field = FieldSpec::required("email", "your email address");
        let question = generate_field_question_only(
            &provider,
            &NullUsageReporter,
            Language::English,
            &field,
        )
        .await;
        assert_eq!(question, "Could you share your email address?");
    }
}
