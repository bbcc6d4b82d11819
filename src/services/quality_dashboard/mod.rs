//! Quality Dashboard Aggregator
//!
//! Read-side batch component over the persisted telemetry contract.
//! Stateless and idempotent: every invocation fetches a bounded,
//! time-windowed slice of assistant turns and computes over it, so
//! concurrent dashboard requests are safe. The numeric report always
//! succeeds; the optional AI narrative degrades to a stub.

pub mod alerts;
pub mod review;
pub mod summary;

pub use alerts::{build_interview_quality_alerts, AlertSeverity, AlertThresholds, QualityAlert};
pub use review::{generate_ai_review, AiReview};
pub use summary::{
    summarize_interview_quality_turns, top_failing_bots, BotQualityBreakdown,
    InterviewQualityWindowSummary,
};

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use interview_llm::{LlmProvider, UsageReporter};

use crate::storage::MessageStore;
use crate::utils::error::AppResult;

/// Dashboard request options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardOptions {
    /// Window length in hours
    pub window_hours: i64,
    /// Turn cap per window
    pub max_turns: u32,
    /// Whether to spend an LLM call on the narrative review
    pub include_ai_review: bool,
    pub thresholds: AlertThresholds,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            window_hours: 24,
            max_turns: 2000,
            include_ai_review: false,
            thresholds: AlertThresholds::default(),
        }
    }
}

/// Window-over-window movement of the headline rates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct QualityDelta {
    pub pass_rate: f64,
    pub gate_trigger_rate: f64,
    pub fallback_rate: f64,
    pub evaluated: i64,
}

impl QualityDelta {
    fn between(
        current: &InterviewQualityWindowSummary,
        previous: &InterviewQualityWindowSummary,
    ) -> Self {
        Self {
            pass_rate: current.pass_rate - previous.pass_rate,
            gate_trigger_rate: current.gate_trigger_rate - previous.gate_trigger_rate,
            fallback_rate: current.fallback_rate - previous.fallback_rate,
            evaluated: current.evaluated as i64 - previous.evaluated as i64,
        }
    }
}

/// The aggregator's full output, consumed by an admin dashboard page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewQualityDashboardData {
    /// Report timestamp (ISO-8601)
    pub generated_at: String,
    pub window_hours: i64,
    pub max_turns: u32,
    pub current: InterviewQualityWindowSummary,
    pub previous: InterviewQualityWindowSummary,
    pub delta: QualityDelta,
    pub top_failing_bots: Vec<BotQualityBreakdown>,
    pub alerts: Vec<QualityAlert>,
    pub thresholds: AlertThresholds,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_review: Option<AiReview>,
}

/// Compute the dashboard report for `[now - window, now)` against the
/// preceding equal-length window.
///
/// With `include_ai_review` off, no LLM call is made and `ai_review` is
/// `None`. With it on but no provider configured, a "not generated" stub
/// is returned instead of an error.
pub async fn get_interview_quality_dashboard_data(
    store: &MessageStore,
    provider: Option<&dyn LlmProvider>,
    reporter: &dyn UsageReporter,
    opts: &DashboardOptions,
) -> AppResult<InterviewQualityDashboardData> {
    let now = Utc::now();
    let window = Duration::hours(opts.window_hours);
    let window_start = now - window;
    let previous_start = window_start - window;

    let current_slice = store.fetch_assistant_turns(
        &window_start.to_rfc3339(),
        &now.to_rfc3339(),
        opts.max_turns,
    )?;
    let previous_slice = store.fetch_assistant_turns(
        &previous_start.to_rfc3339(),
        &window_start.to_rfc3339(),
        opts.max_turns,
    )?;

    let current = summarize_interview_quality_turns(&current_slice);
    let previous = summarize_interview_quality_turns(&previous_slice);
    debug!(
        current_turns = current.total_turns,
        previous_turns = previous.total_turns,
        "Computed dashboard windows"
    );

    let delta = QualityDelta::between(&current, &previous);
    let top_failing = top_failing_bots(&current);
    let alerts = build_interview_quality_alerts(&current, Some(&previous), &opts.thresholds);

    let ai_review = if !opts.include_ai_review {
        None
    } else {
        match provider {
            Some(provider) => {
                Some(generate_ai_review(provider, reporter, &current, &previous).await)
            }
            None => Some(AiReview::not_generated("no provider configured")),
        }
    };

    Ok(InterviewQualityDashboardData {
        generated_at: now.to_rfc3339(),
        window_hours: opts.window_hours,
        max_turns: opts.max_turns,
        current,
        previous,
        delta,
        top_failing_bots: top_failing,
        alerts,
        thresholds: opts.thresholds.clone(),
        ai_review,
    })
}
