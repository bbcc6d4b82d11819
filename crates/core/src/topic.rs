//! Topics and Turn Budgets
//!
//! A bot configuration supplies an ordered list of topic blocks, each with
//! a per-topic turn budget. The supervisor spends the budget one turn at a
//! time and may grant bonus turns past `base_turns` when engagement is
//! high, but never past `max_turns`: budgets are hard caps.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// One topic the interview must cover. Created at bot-configuration time;
/// consumed read-only by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicBlock {
    /// Stable topic identifier
    pub id: String,
    /// Display label, also the source of topic anchors
    pub label: String,
    /// Optional longer description
    pub description: Option<String>,
}

impl TopicBlock {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Turn budget for the current topic.
///
/// Invariants: `min_turns <= base_turns <= max_turns`; `turns_used` is
/// monotonically non-decreasing within a topic's lifetime and never
/// exceeds `max_turns`; it resets to zero on topic transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicBudget {
    pub base_turns: u32,
    pub min_turns: u32,
    pub max_turns: u32,
    pub turns_used: u32,
    pub bonus_turns_granted: u32,
}

impl TopicBudget {
    /// Create a budget, validating the ordering invariant
    pub fn new(min_turns: u32, base_turns: u32, max_turns: u32) -> CoreResult<Self> {
        if min_turns > base_turns || base_turns > max_turns {
            return Err(CoreError::validation(format!(
                "Invalid topic budget: min={} base={} max={}",
                min_turns, base_turns, max_turns
            )));
        }
        Ok(Self {
            base_turns,
            min_turns,
            max_turns,
            turns_used: 0,
            bonus_turns_granted: 0,
        })
    }

    /// Record one conversational turn spent on this topic.
    /// Saturates at `max_turns`; the supervisor transitions before the
    /// ceiling is crossed, so saturation only guards against double counts.
    pub fn record_turn(&mut self) {
        if self.turns_used < self.max_turns {
            self.turns_used += 1;
        }
    }

    /// Grant one bonus turn beyond `base_turns`, bounded by `max_turns`.
    /// Returns true if the grant took effect.
    pub fn grant_bonus(&mut self) -> bool {
        if self.base_turns + self.bonus_turns_granted < self.max_turns {
            self.bonus_turns_granted += 1;
            true
        } else {
            false
        }
    }

    /// Effective allowance for this topic: base plus granted bonus,
    /// capped at max.
    pub fn allowed_turns(&self) -> u32 {
        (self.base_turns + self.bonus_turns_granted).min(self.max_turns)
    }

    /// Whether the hard ceiling has been reached
    pub fn exhausted(&self) -> bool {
        self.turns_used >= self.max_turns
    }

    /// Whether the current allowance (base + bonus) has been spent
    pub fn allowance_spent(&self) -> bool {
        self.turns_used >= self.allowed_turns()
    }

    /// Whether the topic has had at least its minimum turns
    pub fn min_satisfied(&self) -> bool {
        self.turns_used >= self.min_turns
    }

    /// Reset for a new topic
    pub fn reset(&mut self) {
        self.turns_used = 0;
        self.bonus_turns_granted = 0;
    }
}

impl Default for TopicBudget {
    fn default() -> Self {
        Self {
            base_turns: 3,
            min_turns: 1,
            max_turns: 5,
            turns_used: 0,
            bonus_turns_granted: 0,
        }
    }
}

/// Ephemeral per-turn ranking signal for bonus-turn decisions.
///
/// Recomputed every turn from response length; not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterestingTopic {
    pub topic_id: String,
    pub topic_label: String,
    /// Engagement score in `0.0..=1.0`
    pub engagement_score: f64,
    /// Short excerpt of the most engaged answer, if usable
    pub best_snippet: Option<String>,
}

impl InterestingTopic {
    /// Words at or above which a response counts as fully engaged.
    /// Aligned with the `Rich` response-depth threshold.
    pub const FULL_ENGAGEMENT_WORDS: usize = 35;

    /// Score engagement from a response's word count, clamped to `0..=1`
    pub fn score_from_word_count(words: usize) -> f64 {
        (words as f64 / Self::FULL_ENGAGEMENT_WORDS as f64).clamp(0.0, 1.0)
    }

    /// Build the per-turn signal for a topic from the latest user response
    pub fn from_response(topic: &TopicBlock, response: &str) -> Self {
        let words = response.split_whitespace().count();
        let score = Self::score_from_word_count(words);
        let best_snippet = if words >= 5 {
            Some(excerpt(response, 140))
        } else {
            None
        };
        Self {
            topic_id: topic.id.clone(),
            topic_label: topic.label.clone(),
            engagement_score: score,
            best_snippet,
        }
    }
}

/// Truncate text to at most `max_chars`, cutting on a word boundary
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut out = String::new();
    for word in trimmed.split_whitespace() {
        if out.chars().count() + word.chars().count() + 1 > max_chars {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    if out.is_empty() {
        // Single word longer than the cap
        out = trimmed.chars().take(max_chars).collect();
    }
    out
}
