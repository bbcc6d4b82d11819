//! Quality Dashboard Integration Tests
//!
//! Seeds a store with telemetry-bearing assistant turns across two time
//! windows and checks the aggregated report, the alert battery, and the
//! AI-review gating (no provider call unless requested).

use std::sync::Arc;

use chrono::{Duration, Utc};
use interview_core::{FlowFlags, MessageMetadata, QualityTelemetry};
use interview_engine::models::{Message, MessageRole};
use interview_engine::services::quality_dashboard::{
    get_interview_quality_dashboard_data, DashboardOptions,
};
use interview_engine::storage::MessageStore;
use interview_llm::NullUsageReporter;
use uuid::Uuid;

use crate::support::ScriptedProvider;

fn assistant_turn(
    store: &MessageStore,
    bot_id: &str,
    hours_ago: i64,
    passed: bool,
    score: f64,
) {
    let metadata = MessageMetadata {
        quality: Some(QualityTelemetry {
            eligible: true,
            evaluated: true,
            score: Some(score),
            passed: Some(passed),
            ..Default::default()
        }),
        flow_flags: Some(FlowFlags::default()),
        model_id: Some("m1".to_string()),
    };
    store
        .append_message(&Message {
            id: Uuid::new_v4().to_string(),
            conversation_id: "c1".to_string(),
            bot_id: bot_id.to_string(),
            role: MessageRole::Assistant,
            content: "q?".to_string(),
            metadata,
            created_at: (Utc::now() - Duration::hours(hours_ago)).to_rfc3339(),
        })
        .unwrap();
}

#[tokio::test]
async fn test_dashboard_windows_and_delta() {
    let store = MessageStore::new_in_memory().unwrap();
    // Current window (last 24h): 30 turns, 24 passed
    for i in 0..30 {
        assistant_turn(&store, "bot-1", 1, i < 24, 0.8);
    }
    // Previous window (24-48h ago): 30 turns, 30 passed
    for _ in 0..30 {
        assistant_turn(&store, "bot-1", 30, true, 1.0);
    }

    let data = get_interview_quality_dashboard_data(
        &store,
        None,
        &NullUsageReporter,
        &DashboardOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(data.current.total_turns, 30);
    assert_eq!(data.previous.total_turns, 30);
    assert!((data.current.pass_rate - 0.8).abs() < 1e-9);
    assert!((data.previous.pass_rate - 1.0).abs() < 1e-9);
    assert!((data.delta.pass_rate + 0.2).abs() < 1e-9);
    assert!(data.ai_review.is_none());

    // 80% pass: warning plus the window-over-window drop
    assert!(data.alerts.iter().any(|a| a.code == "pass_rate_warning"));
    assert!(data.alerts.iter().any(|a| a.code == "pass_rate_drop"));
}

#[tokio::test]
async fn test_dashboard_without_review_never_calls_provider() {
    let store = MessageStore::new_in_memory().unwrap();
    for _ in 0..30 {
        assistant_turn(&store, "bot-1", 1, true, 1.0);
    }
    let provider = Arc::new(ScriptedProvider::new());

    let data = get_interview_quality_dashboard_data(
        &store,
        Some(provider.as_ref()),
        &NullUsageReporter,
        &DashboardOptions::default(),
    )
    .await
    .unwrap();

    assert!(data.ai_review.is_none());
    assert_eq!(provider.object_call_count(), 0);
    assert_eq!(provider.text_call_count(), 0);
}

#[tokio::test]
async fn test_dashboard_review_generated_when_requested() {
    let store = MessageStore::new_in_memory().unwrap();
    for _ in 0..30 {
        assistant_turn(&store, "bot-1", 1, true, 1.0);
    }
    let provider = Arc::new(ScriptedProvider::new());
    provider.push_object(serde_json::json!({
        "summary": "Quality is healthy this window.",
        "actions": ["Keep monitoring"],
        "risks": []
    }));

    let opts = DashboardOptions {
        include_ai_review: true,
        ..Default::default()
    };
    let data = get_interview_quality_dashboard_data(
        &store,
        Some(provider.as_ref()),
        &NullUsageReporter,
        &opts,
    )
    .await
    .unwrap();

    let review = data.ai_review.unwrap();
    assert!(review.generated);
    assert_eq!(review.summary, "Quality is healthy this window.");
    assert_eq!(provider.object_call_count(), 1);
}

#[tokio::test]
async fn test_dashboard_review_stub_without_provider() {
    let store = MessageStore::new_in_memory().unwrap();
    let opts = DashboardOptions {
        include_ai_review: true,
        ..Default::default()
    };

    let data = get_interview_quality_dashboard_data(&store, None, &NullUsageReporter, &opts)
        .await
        .unwrap();

    let review = data.ai_review.unwrap();
    assert!(!review.generated);
    assert!(review.summary.contains("not generated"));
}

#[tokio::test]
async fn test_low_traffic_only_fires_sample_alert() {
    let store = MessageStore::new_in_memory().unwrap();
    // Terrible pass rate, tiny sample
    for _ in 0..5 {
        assistant_turn(&store, "bot-1", 1, false, 0.2);
    }

    let data = get_interview_quality_dashboard_data(
        &store,
        None,
        &NullUsageReporter,
        &DashboardOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(data.alerts.len(), 1);
    assert_eq!(data.alerts[0].code, "sample_too_small");
}

#[tokio::test]
async fn test_turn_cap_marks_truncation() {
    let store = MessageStore::new_in_memory().unwrap();
    for _ in 0..40 {
        assistant_turn(&store, "bot-1", 1, true, 1.0);
    }

    let opts = DashboardOptions {
        max_turns: 25,
        ..Default::default()
    };
    let data =
        get_interview_quality_dashboard_data(&store, None, &NullUsageReporter, &opts)
            .await
            .unwrap();

    assert_eq!(data.current.total_turns, 25);
    assert!(data.current.truncated);
}

#[test]
fn test_file_backed_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("messages.db");
    {
        let store = MessageStore::new(&path).unwrap();
        assistant_turn(&store, "bot-1", 1, true, 1.0);
    }
    // Reopen and read back
    let store = MessageStore::new(&path).unwrap();
    let slice = store
        .fetch_assistant_turns(
            &(Utc::now() - Duration::hours(2)).to_rfc3339(),
            &Utc::now().to_rfc3339(),
            10,
        )
        .unwrap();
    assert_eq!(slice.turns.len(), 1);
}
