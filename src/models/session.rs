//! Session Models
//!
//! Bot configuration (read-only input owned by external CRUD) and the
//! per-conversation state the supervisor mutates turn by turn. One user,
//! one active turn at a time per conversation: no cross-conversation
//! shared mutable state exists in the engine.

use serde::{Deserialize, Serialize};

use interview_core::{
    InterestingTopic, Language, MessageMetadata, Phase, TopicBlock, TopicBudget,
};

/// Role of a persisted conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "assistant" => Self::Assistant,
            _ => Self::User,
        }
    }
}

/// One persisted conversation turn. Append-only: never mutated after the
/// turn is finalized. Telemetry metadata is written only for assistant
/// turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,
    /// Parent conversation ID
    pub conversation_id: String,
    /// Bot that owns the conversation
    pub bot_id: String,
    pub role: MessageRole,
    pub content: String,
    pub metadata: MessageMetadata,
    /// Created timestamp (ISO-8601)
    pub created_at: String,
}

/// A required field the interview must collect before concluding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Stable field name ("email", "role", ...)
    pub name: String,
    /// Display label used when asking for the field
    pub label: String,
    pub required: bool,
}

impl FieldSpec {
    pub fn required(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            required: true,
        }
    }
}

/// Bot configuration consumed read-only by the engine.
///
/// Owned by bot-configuration CRUD (out of scope); the engine only reads
/// topics, budgets, objective, and sequencing requirements from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub bot_id: String,
    /// Target language, resolved once from the configured language code
    pub language: Language,
    /// Immutable interview objective, input to anchor computations
    pub objective: String,
    /// Ordered topics the interview must cover
    pub topics: Vec<TopicBlock>,
    /// Budget template applied to each topic on entry
    pub topic_budget: TopicBudget,
    /// Whether explicit consent must be collected before concluding
    pub consent_required: bool,
    /// Fields to collect before concluding
    pub fields: Vec<FieldSpec>,
    /// Hard cap on total conversational turns for the session
    pub max_total_turns: u32,
}

impl BotConfig {
    pub fn new(bot_id: impl Into<String>, language_code: &str, objective: impl Into<String>) -> Self {
        Self {
            bot_id: bot_id.into(),
            language: Language::from_code(language_code),
            objective: objective.into(),
            topics: Vec::new(),
            topic_budget: TopicBudget::default(),
            consent_required: true,
            fields: Vec::new(),
            max_total_turns: 40,
        }
    }

    pub fn with_topics(mut self, topics: Vec<TopicBlock>) -> Self {
        self.topics = topics;
        self
    }

    pub fn with_topic_budget(mut self, budget: TopicBudget) -> Self {
        self.topic_budget = budget;
        self
    }

    pub fn with_fields(mut self, fields: Vec<FieldSpec>) -> Self {
        self.fields = fields;
        self
    }

    /// Required fields in configuration order
    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.required)
    }
}

/// Mutable per-conversation state, scoped to one conversation and advanced
/// once per turn by the supervisor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub conversation_id: String,
    pub phase: Phase,
    /// Index into `BotConfig::topics`; saturates at the last topic
    pub topic_index: usize,
    /// Budget for the current topic; resets on transition
    pub budget: TopicBudget,
    pub consent_collected: bool,
    /// Names of fields already collected
    pub collected_fields: Vec<String>,
    /// Total user turns seen this session
    pub total_turns: u32,
    /// Per-topic engagement ranking, recomputed as the session advances
    pub interesting_topics: Vec<InterestingTopic>,
    /// The previous assistant question, used for anti-repetition
    pub last_assistant_question: Option<String>,
}

impl ConversationState {
    /// Start a fresh conversation against a bot configuration
    pub fn new(conversation_id: impl Into<String>, config: &BotConfig) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            phase: Phase::TopicExploration,
            topic_index: 0,
            budget: config.topic_budget.clone(),
            consent_collected: false,
            collected_fields: Vec::new(),
            total_turns: 0,
            interesting_topics: Vec::new(),
            last_assistant_question: None,
        }
    }

    /// The topic currently being explored, if any are configured
    pub fn current_topic<'a>(&self, config: &'a BotConfig) -> Option<&'a TopicBlock> {
        config.topics.get(self.topic_index)
    }

    /// The topic the supervisor would move to next
    pub fn next_topic<'a>(&self, config: &'a BotConfig) -> Option<&'a TopicBlock> {
        config.topics.get(self.topic_index + 1)
    }

    /// Whether all configured topics have been covered
    pub fn on_last_topic(&self, config: &BotConfig) -> bool {
        config.topics.is_empty() || self.topic_index + 1 >= config.topics.len()
    }

    /// First required field not yet collected, in configuration order
    pub fn missing_required_field<'a>(&self, config: &'a BotConfig) -> Option<&'a FieldSpec> {
        config
            .required_fields()
            .find(|f| !self.collected_fields.iter().any(|c| c == &f.name))
    }

    /// Whether the conversation may enter the closing phase
    pub fn ready_to_close(&self, config: &BotConfig) -> bool {
        (!config.consent_required || self.consent_collected)
            && self.missing_required_field(config).is_none()
    }

    /// Record an engagement signal for the current topic, keeping the
    /// best score per topic
    pub fn record_engagement(&mut self, signal: InterestingTopic) {
        match self
            .interesting_topics
            .iter_mut()
            .find(|t| t.topic_id == signal.topic_id)
        {
            Some(existing) => {
                if signal.engagement_score > existing.engagement_score {
                    *existing = signal;
                }
            }
            None => self.interesting_topics.push(signal),
        }
    }
}
