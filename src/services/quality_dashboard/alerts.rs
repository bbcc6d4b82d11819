//! Quality Alerts
//!
//! A fixed battery of threshold comparisons over a window summary. Every
//! threshold is independently configurable with a sensible default. Below
//! the minimum-evaluated-turns floor only the "sample too small" info
//! alert fires, so low-traffic deployments never page anyone.

use serde::{Deserialize, Serialize};

use super::summary::InterviewQualityWindowSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Critical,
    Warning,
    Info,
}

/// One fired alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityAlert {
    pub severity: AlertSeverity,
    /// Stable machine-readable code ("pass_rate_critical", ...)
    pub code: String,
    pub message: String,
}

impl QualityAlert {
    fn critical(code: &str, message: String) -> Self {
        Self {
            severity: AlertSeverity::Critical,
            code: code.to_string(),
            message,
        }
    }

    fn warning(code: &str, message: String) -> Self {
        Self {
            severity: AlertSeverity::Warning,
            code: code.to_string(),
            message,
        }
    }

    fn info(code: &str, message: String) -> Self {
        Self {
            severity: AlertSeverity::Info,
            code: code.to_string(),
            message,
        }
    }
}

/// Alert thresholds; every field has a default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlertThresholds {
    /// Pass rate below this is critical
    pub pass_rate_critical: f64,
    /// Pass rate below this is a warning
    pub pass_rate_warn: f64,
    /// Gate-trigger rate above this is critical
    pub gate_trigger_critical: f64,
    /// Gate-trigger rate above this is a warning
    pub gate_trigger_warn: f64,
    /// Fallback rate above this is critical
    pub fallback_critical: f64,
    /// Fallback rate above this is a warning
    pub fallback_warn: f64,
    /// Completion-guard rate above this is a warning
    pub completion_guard_warn: f64,
    /// Window-over-window pass-rate drop above this is a warning
    pub pass_rate_drop_warn: f64,
    /// Evaluated-turn floor below which only the sample-size alert fires
    pub min_evaluated_turns: u64,
    /// Minimum share of turns that must carry quality telemetry
    pub min_telemetry_coverage: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            pass_rate_critical: 0.75,
            pass_rate_warn: 0.85,
            gate_trigger_critical: 0.35,
            gate_trigger_warn: 0.20,
            fallback_critical: 0.25,
            fallback_warn: 0.10,
            completion_guard_warn: 0.15,
            pass_rate_drop_warn: 0.10,
            min_evaluated_turns: 25,
            min_telemetry_coverage: 0.5,
        }
    }
}

/// Run the alert battery for one window, optionally comparing against the
/// preceding window for the pass-rate-drop check. The result is sorted
/// critical > warning > info.
pub fn build_interview_quality_alerts(
    current: &InterviewQualityWindowSummary,
    previous: Option<&InterviewQualityWindowSummary>,
    thresholds: &AlertThresholds,
) -> Vec<QualityAlert> {
    if current.evaluated < thresholds.min_evaluated_turns {
        return vec![QualityAlert::info(
            "sample_too_small",
            format!(
                "Only {} evaluated turns in the window (floor {}), quality alerts suppressed",
                current.evaluated, thresholds.min_evaluated_turns
            ),
        )];
    }

    let mut alerts = Vec::new();

    if current.total_turns > 0 {
        let coverage = current.with_quality_telemetry as f64 / current.total_turns as f64;
        if coverage < thresholds.min_telemetry_coverage {
            alerts.push(QualityAlert::warning(
                "low_telemetry_coverage",
                format!(
                    "Only {:.0}% of assistant turns carry quality telemetry",
                    coverage * 100.0
                ),
            ));
        }
    }

    if current.pass_rate < thresholds.pass_rate_critical {
        alerts.push(QualityAlert::critical(
            "pass_rate_critical",
            format!("Gate pass rate at {:.0}%", current.pass_rate * 100.0),
        ));
    } else if current.pass_rate < thresholds.pass_rate_warn {
        alerts.push(QualityAlert::warning(
            "pass_rate_warning",
            format!("Gate pass rate at {:.0}%", current.pass_rate * 100.0),
        ));
    }

    if current.gate_trigger_rate > thresholds.gate_trigger_critical {
        alerts.push(QualityAlert::critical(
            "gate_trigger_critical",
            format!(
                "Gate rejecting {:.0}% of first candidates",
                current.gate_trigger_rate * 100.0
            ),
        ));
    } else if current.gate_trigger_rate > thresholds.gate_trigger_warn {
        alerts.push(QualityAlert::warning(
            "gate_trigger_warning",
            format!(
                "Gate rejecting {:.0}% of first candidates",
                current.gate_trigger_rate * 100.0
            ),
        ));
    }

    if current.fallback_rate > thresholds.fallback_critical {
        alerts.push(QualityAlert::critical(
            "fallback_critical",
            format!(
                "Deterministic fallback used on {:.0}% of turns",
                current.fallback_rate * 100.0
            ),
        ));
    } else if current.fallback_rate > thresholds.fallback_warn {
        alerts.push(QualityAlert::warning(
            "fallback_warning",
            format!(
                "Deterministic fallback used on {:.0}% of turns",
                current.fallback_rate * 100.0
            ),
        ));
    }

    if current.completion_guard_rate > thresholds.completion_guard_warn {
        alerts.push(QualityAlert::warning(
            "completion_guard_warning",
            format!(
                "Completion guard intercepting {:.0}% of flow-tracked turns",
                current.completion_guard_rate * 100.0
            ),
        ));
    }

    if let Some(previous) = previous {
        if previous.evaluated >= thresholds.min_evaluated_turns {
            let drop = previous.pass_rate - current.pass_rate;
            if drop > thresholds.pass_rate_drop_warn {
                alerts.push(QualityAlert::warning(
                    "pass_rate_drop",
                    format!(
                        "Pass rate dropped {:.0} points vs previous window ({:.0}% -> {:.0}%)",
                        drop * 100.0,
                        previous.pass_rate * 100.0,
                        current.pass_rate * 100.0
                    ),
                ));
            }
        }
    }

    alerts.sort_by_key(|a| a.severity);
    alerts
}
