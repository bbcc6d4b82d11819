//! Engine Services
//!
//! The per-turn pipeline (anchors, signals, supervisor, bridge, gate,
//! fallback) and the read-side quality dashboard.

pub mod anchors;
pub mod bridge;
pub mod fallback;
pub mod gate;
pub mod quality_dashboard;
pub mod signals;
pub mod supervisor;

pub use anchors::{build_message_anchors, build_topic_anchors, AnchorSet};
pub use bridge::{
    build_natural_topic_cue, build_runtime_semantic_context_prompt, build_soft_diagnostic_hint,
    collect_recent_bridge_stems, is_usable_bridge_snippet, DiagnosticLens, RuntimeContext,
};
pub use fallback::{
    generate_consent_question_only, generate_field_question_only, normalize_single_question,
};
pub use gate::{GateContext, GateOutcome, QualityGate, TurnEngine, PASS_BAR};
pub use quality_dashboard::{
    build_interview_quality_alerts, get_interview_quality_dashboard_data,
    summarize_interview_quality_turns, top_failing_bots, AlertThresholds, DashboardOptions,
    InterviewQualityDashboardData, InterviewQualityWindowSummary,
};
pub use signals::{classify_response_depth, detect_user_turn_signal, TurnSignalContext};
pub use supervisor::{Directive, Supervisor, SupervisorInsight};
