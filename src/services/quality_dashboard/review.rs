//! AI Review
//!
//! Optional narrative layer over the numeric dashboard: one
//! schema-constrained LLM call turning the aggregate report into a short
//! summary, a prioritized action list, and a risk list. Strictly
//! best-effort: any failure degrades to a "not generated" stub so the
//! numeric report never depends on the narrative one.

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use tracing::warn;

use interview_llm::{ChatMessage, LlmProvider, LlmRequest, UsageEvent, UsageReporter};

use super::summary::InterviewQualityWindowSummary;

const REVIEW_MAX_TOKENS: u32 = 600;

/// Narrative review of one dashboard report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AiReview {
    /// Whether a model actually produced this review
    pub generated: bool,
    pub summary: String,
    /// Prioritized actions, most important first
    pub actions: Vec<String>,
    pub risks: Vec<String>,
}

impl AiReview {
    /// Stub returned when no provider is configured or the call failed
    pub fn not_generated(reason: &str) -> Self {
        Self {
            generated: false,
            summary: format!("AI review not generated: {}", reason),
            actions: Vec::new(),
            risks: Vec::new(),
        }
    }
}

/// Schema target for the constrained review call
#[derive(Debug, Deserialize, JsonSchema)]
struct ReviewPayload {
    summary: String,
    actions: Vec<String>,
    risks: Vec<String>,
}

/// Generate the narrative review for a pair of window summaries.
///
/// Total: provider errors, schema violations, and serialization failures
/// all degrade to the stub.
pub async fn generate_ai_review(
    provider: &dyn LlmProvider,
    reporter: &dyn UsageReporter,
    current: &InterviewQualityWindowSummary,
    previous: &InterviewQualityWindowSummary,
) -> AiReview {
    let report = match serde_json::to_string_pretty(&serde_json::json!({
        "current": current,
        "previous": previous,
    })) {
        Ok(report) => report,
        Err(e) => {
            warn!(error = %e, "Failed to serialize dashboard report for review");
            return AiReview::not_generated("report serialization failed");
        }
    };

    let schema = match serde_json::to_value(schema_for!(ReviewPayload)) {
        Ok(schema) => schema,
        Err(e) => {
            warn!(error = %e, "Failed to serialize review schema");
            return AiReview::not_generated("schema serialization failed");
        }
    };

    let system = "You review interview-quality telemetry for an operations team. \
                  Given the current and previous window summaries, write a short plain \
                  summary (2-4 sentences), a prioritized list of concrete actions, and a \
                  list of risks. Be specific about rates and their direction.";
    let request = LlmRequest::new(vec![ChatMessage::user(report)])
        .with_system(system)
        .with_temperature(0.2)
        .with_max_tokens(REVIEW_MAX_TOKENS);

    match provider.generate_object(request, &schema).await {
        Ok(response) => {
            reporter.report(&UsageEvent {
                provider: provider.name().to_string(),
                model_id: response.model_id.clone(),
                label: "ai_review".to_string(),
                usage: response.usage,
            });
            match serde_json::from_value::<ReviewPayload>(response.value) {
                Ok(payload) => AiReview {
                    generated: true,
                    summary: payload.summary,
                    actions: payload.actions,
                    risks: payload.risks,
                },
                Err(e) => {
                    warn!(error = %e, "AI review returned wrong shape");
                    AiReview::not_generated("model returned an unexpected shape")
                }
            }
        }
        Err(e) => {
            warn!(error = %e, "AI review call failed");
            AiReview::not_generated("model call failed")
        }
    }
}
