//! Per-Turn Telemetry Contract
//!
//! Structured metadata written on every finalized assistant turn and read
//! back by the quality dashboard aggregator. Field names and the
//! null-vs-false semantics are part of the external interface consumed by
//! reporting UIs and must not change casually.
//!
//! The parser in this module is the single point of truth for
//! "missing vs. false": metadata written by older code paths may lack the
//! `quality`/`flowFlags` keys entirely, and that means "no telemetry",
//! never "zero/failed".

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Quality-gate outcome for one assistant turn.
///
/// Invariant: `score` and `passed` are `None` unless `evaluated` is true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct QualityTelemetry {
    /// Whether the turn was eligible for evaluation (open phases only)
    pub eligible: bool,
    /// Whether scoring was actually attempted
    pub evaluated: bool,
    /// Gate score in `0.0..=1.0`; null unless evaluated
    pub score: Option<f64>,
    /// Whether the score cleared the bar; null unless evaluated
    pub passed: Option<bool>,
    /// Whether the gate rejected the first candidate
    pub gate_triggered: bool,
    /// Whether a regeneration was attempted
    pub regenerated: bool,
    /// Whether the deterministic fallback produced the final text
    pub fallback_used: bool,
}

impl QualityTelemetry {
    /// Enforce the null-unless-evaluated invariant in place
    pub fn normalize(&mut self) {
        if !self.evaluated {
            self.score = None;
            self.passed = None;
        }
    }
}

/// Flow-control interceptions recorded for one assistant turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FlowFlags {
    /// A premature topic closure was intercepted and rewritten
    pub topic_closure_intercepted: bool,
    /// A closure after a deepening offer was intercepted
    pub deep_offer_closure_intercepted: bool,
    /// The completion guard intercepted a premature conclusion attempt
    pub completion_guard_intercepted: bool,
    /// Conclusion was blocked because consent is still missing
    pub completion_blocked_for_consent: bool,
    /// Conclusion was blocked because a required field is still missing
    pub completion_blocked_for_missing_field: bool,
}

impl FlowFlags {
    /// Whether any interception fired this turn
    pub fn any(&self) -> bool {
        self.topic_closure_intercepted
            || self.deep_offer_closure_intercepted
            || self.completion_guard_intercepted
            || self.completion_blocked_for_consent
            || self.completion_blocked_for_missing_field
    }
}

/// Metadata persisted on an assistant `Message`. Both sub-objects are
/// optional: user turns and degenerate turns carry neither.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityTelemetry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_flags: Option<FlowFlags>,
    /// Model identifier used for this turn, for telemetry tagging only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
}

/// Fully-defaulted view of assistant telemetry, with explicit presence
/// flags so consumers can distinguish "no telemetry" from "all false".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AssistantTelemetry {
    pub has_quality_telemetry: bool,
    pub has_flow_telemetry: bool,
    pub quality: QualityTelemetry,
    pub flow_flags: FlowFlags,
    pub model_id: Option<String>,
}

/// Parse raw message metadata into a fully-defaulted telemetry view.
///
/// Total: never errors. Missing keys, nulls, wrong shapes, and legacy
/// metadata all resolve to defaults with the corresponding `has_*`
/// presence flag left false. The score/passed null-unless-evaluated
/// invariant is re-enforced on the way in, since stored blobs are not
/// trusted to respect it.
pub fn parse_assistant_telemetry(metadata: &Value) -> AssistantTelemetry {
    let obj = match metadata.as_object() {
        Some(o) => o,
        None => return AssistantTelemetry::default(),
    };

    let mut out = AssistantTelemetry::default();

    if let Some(quality_value) = obj.get("quality") {
        if quality_value.is_object() {
            if let Ok(mut quality) =
                serde_json::from_value::<QualityTelemetry>(quality_value.clone())
            {
                quality.normalize();
                out.quality = quality;
                out.has_quality_telemetry = true;
            }
        }
    }

    if let Some(flags_value) = obj.get("flowFlags") {
        if flags_value.is_object() {
            if let Ok(flags) = serde_json::from_value::<FlowFlags>(flags_value.clone()) {
                out.flow_flags = flags;
                out.has_flow_telemetry = true;
            }
        }
    }

    out.model_id = obj
        .get("modelId")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_metadata_yields_defaults() {
        let parsed = parse_assistant_telemetry(&json!({}));
        assert!(!parsed.has_quality_telemetry);
        assert!(!parsed.has_flow_telemetry);
        assert!(!parsed.quality.eligible);
        assert!(parsed.quality.score.is_none());
        assert!(parsed.quality.passed.is_none());
        assert!(!parsed.flow_flags.any());
    }

    #[test]
    fn test_non_object_metadata_never_panics() {
        for value in [json!(null), json!("x"), json!(42), json!([1, 2])] {
            let parsed = parse_assistant_telemetry(&value);
            assert!(!parsed.has_quality_telemetry);
            assert!(!parsed.has_flow_telemetry);
        }
    }

    #[test]
    fn test_quality_round_trip() {
        let metadata = json!({
            "quality": {
                "eligible": true,
                "evaluated": true,
                "score": 0.8,
                "passed": true,
                "gateTriggered": false,
                "regenerated": false,
                "fallbackUsed": false
            },
            "flowFlags": {
                "completionGuardIntercepted": true
            },
            "modelId": "gpt-4o"
        });

        let parsed = parse_assistant_telemetry(&metadata);
        assert!(parsed.has_quality_telemetry);
        assert!(parsed.has_flow_telemetry);
        assert_eq!(parsed.quality.score, Some(0.8));
        assert_eq!(parsed.quality.passed, Some(true));
        assert!(parsed.flow_flags.completion_guard_intercepted);
        assert!(!parsed.flow_flags.topic_closure_intercepted);
        assert_eq!(parsed.model_id.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn test_score_cleared_when_not_evaluated() {
        // A stored blob violating the invariant gets normalized on parse
        let metadata = json!({
            "quality": { "eligible": true, "evaluated": false, "score": 0.9, "passed": true }
        });
        let parsed = parse_assistant_telemetry(&metadata);
        assert!(parsed.has_quality_telemetry);
        assert!(parsed.quality.score.is_none());
        assert!(parsed.quality.passed.is_none());
    }

    #[test]
    fn test_partial_flags_default_rest() {
        let metadata = json!({ "flowFlags": { "topicClosureIntercepted": true } });
        let parsed = parse_assistant_telemetry(&metadata);
        assert!(parsed.flow_flags.topic_closure_intercepted);
        assert!(!parsed.flow_flags.completion_blocked_for_consent);
    }

    #[test]
    fn test_metadata_serializes_camel_case() {
        let metadata = MessageMetadata {
            quality: Some(QualityTelemetry {
                eligible: true,
                evaluated: true,
                score: Some(0.7),
                passed: Some(true),
                gate_triggered: true,
                regenerated: false,
                fallback_used: false,
            }),
            flow_flags: Some(FlowFlags::default()),
            model_id: None,
        };
        let value = serde_json::to_value(&metadata).unwrap();
        assert!(value["quality"]["gateTriggered"].as_bool().unwrap());
        assert!(value["flowFlags"]["topicClosureIntercepted"].is_boolean());
        assert!(value.get("modelId").is_none());
    }
}
