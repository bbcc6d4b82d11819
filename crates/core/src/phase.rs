//! Interview Phases and Transition Modes
//!
//! The phase enum is the backbone of the turn state machine. Exactly one
//! phase is active per conversation at any time. Only the two "open" phases
//! (exploration and deepening) run off-topic/clarification detection;
//! consent and field collection expect terse answers and suppress it.

use serde::{Deserialize, Serialize};

/// Interview lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Exploring the current topic with broad questions
    TopicExploration,
    /// Deepening the current topic after an engaged answer
    TopicDeepening,
    /// Collecting explicit consent (yes/no)
    ConsentCollection,
    /// Collecting a specific required field (e.g. email, role)
    FieldCollection,
    /// Wrapping up the interview
    Closing,
}

impl Phase {
    /// Whether this phase is "open": free-form conversation where the
    /// turn signal classifier is active. All other phases suppress
    /// off-topic and clarification detection.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::TopicExploration | Self::TopicDeepening)
    }

    /// Get the string form for database storage and telemetry
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TopicExploration => "topic_exploration",
            Self::TopicDeepening => "topic_deepening",
            Self::ConsentCollection => "consent_collection",
            Self::FieldCollection => "field_collection",
            Self::Closing => "closing",
        }
    }

    /// Parse from string, defaulting to exploration for unknown values
    pub fn from_str(s: &str) -> Self {
        match s {
            "topic_deepening" => Self::TopicDeepening,
            "consent_collection" => Self::ConsentCollection,
            "field_collection" => Self::FieldCollection,
            "closing" => Self::Closing,
            _ => Self::TopicExploration,
        }
    }
}

impl Default for Phase {
    fn default() -> Self {
        Self::TopicExploration
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the next assistant utterance should connect to the previous turn.
///
/// `Bridge` ties back explicitly to what the user just said; `CleanPivot`
/// changes topic with no forced connection; `Continuity` is the default
/// same-topic flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionMode {
    Continuity,
    Bridge,
    CleanPivot,
}

impl TransitionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Continuity => "continuity",
            Self::Bridge => "bridge",
            Self::CleanPivot => "clean_pivot",
        }
    }
}

impl Default for TransitionMode {
    fn default() -> Self {
        Self::Continuity
    }
}

/// Classification of a user turn, produced by the signal classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserTurnSignal {
    /// Ordinary content; normal progression applies
    None,
    /// The user asked what the question meant or gave a bare filler
    Clarification,
    /// The user asked a question unrelated to the interview
    OffTopicQuestion,
}

/// Response depth bucket, derived purely from word count.
///
/// Used to calibrate how much the next question should probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseDepth {
    /// At most 10 words
    Brief,
    /// 11 to 34 words
    Balanced,
    /// 35 words or more
    Rich,
}

impl Default for ResponseDepth {
    fn default() -> Self {
        Self::Brief
    }
}

impl ResponseDepth {
    /// Bucket a word count into a depth
    pub fn from_word_count(words: usize) -> Self {
        if words <= 10 {
            Self::Brief
        } else if words < 35 {
            Self::Balanced
        } else {
            Self::Rich
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Brief => "brief",
            Self::Balanced => "balanced",
            Self::Rich => "rich",
        }
    }
}
