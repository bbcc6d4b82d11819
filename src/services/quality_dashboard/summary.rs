//! Window Summaries
//!
//! Pure aggregation of assistant-turn telemetry into one window summary.
//! Inputs are the `(bot_id, metadata)` slices from storage; conversation
//! content never enters this module. Idempotent: the same slice always
//! produces the same summary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use interview_core::parse_assistant_telemetry;

use crate::storage::AssistantTurnSlice;

/// Evaluated-turn floor below which a bot is excluded from the worst
/// performers list
const BOT_MIN_EVALUATED: u64 = 8;

/// Worst performers list length
const TOP_FAILING_LIMIT: usize = 12;

/// Per-bot quality breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotQualityBreakdown {
    pub bot_id: String,
    pub total_turns: u64,
    pub evaluated: u64,
    pub passed: u64,
    pub failed: u64,
    pub pass_rate: f64,
}

/// Aggregated quality telemetry for one time window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct InterviewQualityWindowSummary {
    /// All assistant turns in the window
    pub total_turns: u64,
    /// Turns that carried a quality telemetry object at all
    pub with_quality_telemetry: u64,
    /// Turns that carried a flow-flags object
    pub with_flow_telemetry: u64,
    pub evaluated: u64,
    pub passed: u64,
    pub failed: u64,
    /// passed / evaluated
    pub pass_rate: f64,
    /// gate-triggered / evaluated
    pub gate_trigger_rate: f64,
    /// fallback-used / turns with quality telemetry
    pub fallback_rate: f64,
    /// regenerated / evaluated
    pub regeneration_rate: f64,
    /// completion-guard interceptions / turns with flow telemetry
    pub completion_guard_rate: f64,
    /// Mean gate score over evaluated turns; null with none
    pub avg_score: Option<f64>,
    /// Whether the storage fetch hit its turn cap
    pub truncated: bool,
    /// Per-bot breakdown, sorted by descending turn count
    pub bots: Vec<BotQualityBreakdown>,
}

/// Aggregate one window of assistant turns.
///
/// Turns without telemetry count toward `total_turns` only; missing
/// metadata is "no telemetry", never "failed".
pub fn summarize_interview_quality_turns(
    slice: &AssistantTurnSlice,
) -> InterviewQualityWindowSummary {
    let mut summary = InterviewQualityWindowSummary {
        total_turns: slice.turns.len() as u64,
        truncated: slice.truncated,
        ..Default::default()
    };

    let mut gate_triggered = 0u64;
    let mut regenerated = 0u64;
    let mut fallback_used = 0u64;
    let mut completion_guard = 0u64;
    let mut score_sum = 0.0f64;
    let mut score_count = 0u64;

    // BTreeMap keeps the per-bot iteration order deterministic
    let mut bots: BTreeMap<String, BotQualityBreakdown> = BTreeMap::new();

    for turn in &slice.turns {
        let telemetry = parse_assistant_telemetry(&turn.metadata);

        let bot = bots
            .entry(turn.bot_id.clone())
            .or_insert_with(|| BotQualityBreakdown {
                bot_id: turn.bot_id.clone(),
                total_turns: 0,
                evaluated: 0,
                passed: 0,
                failed: 0,
                pass_rate: 0.0,
            });
        bot.total_turns += 1;

        if telemetry.has_quality_telemetry {
            summary.with_quality_telemetry += 1;
            let quality = &telemetry.quality;

            if quality.fallback_used {
                fallback_used += 1;
            }
            if quality.evaluated {
                summary.evaluated += 1;
                bot.evaluated += 1;
                if quality.gate_triggered {
                    gate_triggered += 1;
                }
                if quality.regenerated {
                    regenerated += 1;
                }
                if let Some(score) = quality.score {
                    score_sum += score;
                    score_count += 1;
                }
                if quality.passed == Some(true) {
                    summary.passed += 1;
                    bot.passed += 1;
                } else {
                    summary.failed += 1;
                    bot.failed += 1;
                }
            }
        }

        if telemetry.has_flow_telemetry {
            summary.with_flow_telemetry += 1;
            if telemetry.flow_flags.completion_guard_intercepted {
                completion_guard += 1;
            }
        }
    }

    summary.pass_rate = rate(summary.passed, summary.evaluated);
    summary.gate_trigger_rate = rate(gate_triggered, summary.evaluated);
    summary.regeneration_rate = rate(regenerated, summary.evaluated);
    summary.fallback_rate = rate(fallback_used, summary.with_quality_telemetry);
    summary.completion_guard_rate = rate(completion_guard, summary.with_flow_telemetry);
    summary.avg_score = if score_count > 0 {
        Some(score_sum / score_count as f64)
    } else {
        None
    };

    for bot in bots.values_mut() {
        bot.pass_rate = rate(bot.passed, bot.evaluated);
    }
    let mut bot_list: Vec<BotQualityBreakdown> = bots.into_values().collect();
    bot_list.sort_by(|a, b| b.total_turns.cmp(&a.total_turns));
    summary.bots = bot_list;

    summary
}

/// Worst performers: bots with enough evaluated turns, worst pass rate
/// first, ties broken by higher absolute fail count.
pub fn top_failing_bots(summary: &InterviewQualityWindowSummary) -> Vec<BotQualityBreakdown> {
    let mut failing: Vec<BotQualityBreakdown> = summary
        .bots
        .iter()
        .filter(|b| b.evaluated >= BOT_MIN_EVALUATED)
        .cloned()
        .collect();

    failing.sort_by(|a, b| {
        a.pass_rate
            .partial_cmp(&b.pass_rate)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.failed.cmp(&a.failed))
    });
    failing.truncate(TOP_FAILING_LIMIT);
    failing
}

fn rate(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
