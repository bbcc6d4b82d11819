//! Phase/Topic Supervisor
//!
//! The per-turn state machine. `assess_turn` consumes the user's message,
//! advances the conversation state (phase, topic index, budget, engagement
//! ranking) and emits a `SupervisorInsight` telling the prompt builder what
//! the next assistant utterance must do.
//!
//! Budgets are hard caps: engagement can extend a topic past `base_turns`
//! but never past `max_turns`. Clarification and off-topic signals suspend
//! normal progression for exactly one turn. The closing phase is reachable
//! only after consent and all required fields are in; a completion guard
//! intercepts premature closure and re-routes, recording the interception
//! in the turn's flow flags.

use tracing::debug;

use interview_core::{
    FlowFlags, InterestingTopic, Language, Phase, ResponseDepth, TopicBlock, TransitionMode,
    UserTurnSignal,
};

use super::anchors::build_topic_anchors;
use super::bridge::is_usable_bridge_snippet;
use super::signals::{
    classify_response_depth, detect_user_turn_signal, is_clarification_signal, word_count,
    TurnSignalContext,
};
use crate::models::{BotConfig, ConversationState};

/// What the next assistant utterance must accomplish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Keep exploring the current topic
    StayOnTopic,
    /// Go one level deeper on the current topic
    DeepenTopic,
    /// Move to the next configured topic
    NextTopic,
    /// Answer the clarification request, then re-ask
    HandleClarification,
    /// Briefly acknowledge the off-topic question and steer back
    HandleOffTopic,
    /// Ask the yes/no consent question
    BeginConsent,
    /// Ask for the next missing required field
    CollectField,
    /// Wrap up the interview
    Conclude,
}

/// Per-turn decision emitted by the supervisor
#[derive(Debug, Clone)]
pub struct SupervisorInsight {
    pub directive: Directive,
    pub transition_mode: TransitionMode,
    /// The topic the next question targets, when one applies
    pub target_topic: Option<TopicBlock>,
    /// Required field name to collect, when directive is `CollectField`
    pub target_field: Option<String>,
    pub signal: UserTurnSignal,
    pub depth: ResponseDepth,
    /// Engagement signal recorded for the current topic this turn
    pub interesting_topic: Option<InterestingTopic>,
    /// Flow-control interceptions to persist in the turn's telemetry
    pub flow_flags: FlowFlags,
}

impl SupervisorInsight {
    fn new(signal: UserTurnSignal, depth: ResponseDepth) -> Self {
        Self {
            directive: Directive::StayOnTopic,
            transition_mode: TransitionMode::Continuity,
            target_topic: None,
            target_field: None,
            signal,
            depth,
            interesting_topic: None,
            flow_flags: FlowFlags::default(),
        }
    }
}

/// The turn-by-turn interview state machine
#[derive(Debug, Clone)]
pub struct Supervisor {
    /// Engagement score at or above which a bonus turn is granted
    engagement_bonus_threshold: f64,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self {
            engagement_bonus_threshold: 0.6,
        }
    }
}

impl Supervisor {
    pub fn new(engagement_bonus_threshold: f64) -> Self {
        Self {
            engagement_bonus_threshold: engagement_bonus_threshold.clamp(0.0, 1.0),
        }
    }

    /// Advance the conversation by one user turn.
    ///
    /// Mutates `state` (phase, topic index, budget, engagement ranking,
    /// collected consent/fields) and returns the decision for the next
    /// assistant utterance. Total: degrades to budget-only decisions when
    /// no topic data is configured.
    pub fn assess_turn(
        &self,
        config: &BotConfig,
        state: &mut ConversationState,
        user_message: &str,
    ) -> SupervisorInsight {
        let language = config.language;
        let depth = classify_response_depth(user_message);
        state.total_turns = state.total_turns.saturating_add(1);

        let signal = self.classify_signal(config, state, user_message);
        let mut insight = SupervisorInsight::new(signal, depth);

        if !state.phase.is_open() {
            self.drive_closed_phase(config, state, user_message, &mut insight);
            return insight;
        }

        // Interruptions suspend progression for one turn: the budget is
        // not charged and no transition happens
        match signal {
            UserTurnSignal::Clarification => {
                insight.directive = Directive::HandleClarification;
                insight.target_topic = state.current_topic(config).cloned();
                return insight;
            }
            UserTurnSignal::OffTopicQuestion => {
                insight.directive = Directive::HandleOffTopic;
                insight.target_topic = state.current_topic(config).cloned();
                return insight;
            }
            UserTurnSignal::None => {}
        }

        state.budget.record_turn();

        let engagement = state.current_topic(config).map(|topic| {
            let signal = InterestingTopic::from_response(topic, user_message);
            state.record_engagement(signal.clone());
            signal
        });
        insight.interesting_topic = engagement.clone();

        // Session-wide hard cap: stop opening new threads, drive to the end
        if state.total_turns >= config.max_total_turns {
            self.route_completion(config, state, &mut insight);
            return insight;
        }

        if state.budget.allowance_spent() {
            let score = engagement.as_ref().map(|e| e.engagement_score).unwrap_or(0.0);
            let wants_bonus = score >= self.engagement_bonus_threshold;

            if wants_bonus && !state.budget.exhausted() && state.budget.grant_bonus() {
                debug!(
                    topic_index = state.topic_index,
                    score, "Granting engagement bonus turn"
                );
                state.phase = Phase::TopicDeepening;
                insight.directive = Directive::DeepenTopic;
                insight.target_topic = state.current_topic(config).cloned();
                return insight;
            }

            if wants_bonus {
                // Engagement qualified for more depth but the ceiling
                // refused it; record that the deepening offer was cut off
                insight.flow_flags.deep_offer_closure_intercepted = true;
            }

            if !state.budget.min_satisfied() {
                // Malformed budget edge (base below min after external
                // mutation): keep the topic open rather than close early
                insight.flow_flags.topic_closure_intercepted = true;
                insight.directive = Directive::StayOnTopic;
                insight.target_topic = state.current_topic(config).cloned();
                return insight;
            }

            self.transition_topic(config, state, user_message, language, &mut insight);
            return insight;
        }

        // Budget still open: stay, deepening on a rich answer
        insight.target_topic = state.current_topic(config).cloned();
        if depth == ResponseDepth::Rich && state.phase == Phase::TopicExploration {
            state.phase = Phase::TopicDeepening;
            insight.directive = Directive::DeepenTopic;
        } else {
            insight.directive = Directive::StayOnTopic;
        }
        insight
    }

    fn classify_signal(
        &self,
        config: &BotConfig,
        state: &ConversationState,
        user_message: &str,
    ) -> UserTurnSignal {
        let language = config.language;
        let current = state
            .current_topic(config)
            .map(|t| build_topic_anchors(&t.label, language));
        let target = state
            .next_topic(config)
            .map(|t| build_topic_anchors(&t.label, language));
        let objective = build_topic_anchors(&config.objective, language);

        let ctx = TurnSignalContext {
            current_topic: current.as_ref(),
            target_topic: target.as_ref(),
            objective: Some(&objective),
        };
        detect_user_turn_signal(user_message, language, state.phase, ctx)
    }

    /// Move to the next topic, or into completion sequencing on the last one
    fn transition_topic(
        &self,
        config: &BotConfig,
        state: &mut ConversationState,
        user_message: &str,
        language: Language,
        insight: &mut SupervisorInsight,
    ) {
        if state.on_last_topic(config) {
            self.route_completion(config, state, insight);
            return;
        }

        state.topic_index += 1;
        state.budget.reset();
        state.phase = Phase::TopicExploration;
        insight.directive = Directive::NextTopic;
        insight.target_topic = state.current_topic(config).cloned();
        insight.transition_mode = if is_usable_bridge_snippet(user_message, language) {
            TransitionMode::Bridge
        } else {
            TransitionMode::CleanPivot
        };
        debug!(
            topic_index = state.topic_index,
            mode = insight.transition_mode.as_str(),
            "Transitioning topic"
        );
    }

    /// Completion guard: `Closing` is reachable only once consent and all
    /// required fields are in. A premature closure attempt is re-routed
    /// and the interception recorded.
    fn route_completion(
        &self,
        config: &BotConfig,
        state: &mut ConversationState,
        insight: &mut SupervisorInsight,
    ) {
        if state.ready_to_close(config) {
            state.phase = Phase::Closing;
            insight.directive = Directive::Conclude;
            insight.transition_mode = TransitionMode::CleanPivot;
            return;
        }

        insight.flow_flags.completion_guard_intercepted = true;
        insight.transition_mode = TransitionMode::CleanPivot;

        if config.consent_required && !state.consent_collected {
            insight.flow_flags.completion_blocked_for_consent = true;
            state.phase = Phase::ConsentCollection;
            insight.directive = Directive::BeginConsent;
            return;
        }

        let field = state
            .missing_required_field(config)
            .map(|f| f.name.clone());
        insight.flow_flags.completion_blocked_for_missing_field = true;
        state.phase = Phase::FieldCollection;
        insight.directive = Directive::CollectField;
        insight.target_field = field;
    }

    /// Consent, field collection, and closing turns: terse answers are
    /// expected, no budget or signal handling applies.
    fn drive_closed_phase(
        &self,
        config: &BotConfig,
        state: &mut ConversationState,
        user_message: &str,
        insight: &mut SupervisorInsight,
    ) {
        match state.phase {
            Phase::ConsentCollection => {
                if is_affirmative(user_message, config.language) {
                    state.consent_collected = true;
                    self.route_next_completion_step(config, state, insight);
                } else if is_negative(user_message, config.language) {
                    // Consent declined: conclude without it, never loop
                    state.phase = Phase::Closing;
                    insight.directive = Directive::Conclude;
                } else {
                    insight.directive = Directive::BeginConsent;
                }
            }
            Phase::FieldCollection => {
                let answered = word_count(user_message) >= 1
                    && !is_clarification_signal(user_message, config.language);
                if answered {
                    if let Some(field) = state.missing_required_field(config) {
                        let name = field.name.clone();
                        debug!(field = %name, "Recording collected field");
                        state.collected_fields.push(name);
                    }
                }
                self.route_next_completion_step(config, state, insight);
            }
            Phase::Closing => {
                insight.directive = Directive::Conclude;
            }
            // Open phases never reach here
            Phase::TopicExploration | Phase::TopicDeepening => {
                insight.directive = Directive::StayOnTopic;
            }
        }
    }

    /// After a consent/field answer: ask for whatever is still missing,
    /// then conclude.
    fn route_next_completion_step(
        &self,
        config: &BotConfig,
        state: &mut ConversationState,
        insight: &mut SupervisorInsight,
    ) {
        if config.consent_required && !state.consent_collected {
            state.phase = Phase::ConsentCollection;
            insight.directive = Directive::BeginConsent;
            return;
        }
        if let Some(field) = state.missing_required_field(config) {
            insight.target_field = Some(field.name.clone());
            state.phase = Phase::FieldCollection;
            insight.directive = Directive::CollectField;
            return;
        }
        state.phase = Phase::Closing;
        insight.directive = Directive::Conclude;
    }
}

/// Whether a short answer reads as "yes", with leading negations rejected
fn is_affirmative(text: &str, language: Language) -> bool {
    let pack = language.pack();
    let lower = text.trim().to_lowercase();
    if lower.is_empty() {
        return false;
    }

    let first_word = lower
        .split(|c: char| !c.is_alphanumeric())
        .find(|w| !w.is_empty())
        .unwrap_or("");
    if pack.negation_leads.iter().any(|n| *n == first_word) {
        return false;
    }

    pack.affirmation_tokens.iter().any(|token| {
        if token.contains(' ') {
            lower.contains(token)
        } else {
            lower
                .split(|c: char| !c.is_alphanumeric())
                .any(|word| word == *token)
        }
    })
}

/// Whether a short answer reads as an explicit "no"
fn is_negative(text: &str, language: Language) -> bool {
    let pack = language.pack();
    let first_word = text
        .trim()
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .find(|w| !w.is_empty())
        .map(|w| w.to_string())
        .unwrap_or_default();
    pack.negation_leads.iter().any(|n| *n == first_word)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldSpec;
    use interview_core::{TopicBudget, TopicBlock};

    fn config() -> BotConfig {
        BotConfig::new("bot-1", "en", "Understand churn drivers")
            .with_topics(vec![
                TopicBlock::new("t1", "Customer retention"),
                TopicBlock::new("t2", "Pricing perception"),
            ])
            .with_topic_budget(TopicBudget::new(1, 2, 3).unwrap())
            .with_fields(vec![FieldSpec::required("email", "your email address")])
    }

    fn rich_answer() -> String {
        "churn ".repeat(40)
    }

    #[test]
    fn test_stay_on_topic_within_budget() {
        let config = config();
        let mut state = ConversationState::new("c1", &config);
        let insight = Supervisor::default().assess_turn(
            &config,
            &mut state,
            "We mostly lose customers after the second billing cycle honestly",
        );
        assert_eq!(insight.directive, Directive::StayOnTopic);
        assert_eq!(insight.transition_mode, TransitionMode::Continuity);
        assert_eq!(state.budget.turns_used, 1);
        assert_eq!(insight.target_topic.unwrap().id, "t1");
    }

    #[test]
    fn test_rich_answer_moves_to_deepening() {
        let config = config();
        let mut state = ConversationState::new("c1", &config);
        let insight = Supervisor::default().assess_turn(&config, &mut state, &rich_answer());
        assert_eq!(insight.directive, Directive::DeepenTopic);
        assert_eq!(state.phase, Phase::TopicDeepening);
    }

    #[test]
    fn test_budget_exhaustion_forces_transition() {
        let config = config();
        let mut state = ConversationState::new("c1", &config);
        let supervisor = Supervisor::default();

        supervisor.assess_turn(&config, &mut state, "Short answer about churn here");
        let insight = supervisor.assess_turn(&config, &mut state, "Another brief one ok");
        assert_eq!(insight.directive, Directive::NextTopic);
        assert_eq!(state.topic_index, 1);
        assert_eq!(state.budget.turns_used, 0);
        assert_eq!(state.phase, Phase::TopicExploration);
    }

    #[test]
    fn test_transition_bridges_on_usable_snippet() {
        let config = config();
        let mut state = ConversationState::new("c1", &config);
        let supervisor = Supervisor::default();

        supervisor.assess_turn(&config, &mut state, "We churn a lot in month two");
        let insight = supervisor.assess_turn(
            &config,
            &mut state,
            "Mostly it is the onboarding that never covers billing",
        );
        assert_eq!(insight.directive, Directive::NextTopic);
        assert_eq!(insight.transition_mode, TransitionMode::Bridge);
    }

    #[test]
    fn test_transition_pivots_on_degenerate_snippet() {
        let config = config();
        let mut state = ConversationState::new("c1", &config);
        let supervisor = Supervisor::default();

        supervisor.assess_turn(&config, &mut state, "We churn a lot in month two");
        let insight = supervisor.assess_turn(&config, &mut state, "Not much else");
        assert_eq!(insight.directive, Directive::NextTopic);
        assert_eq!(insight.transition_mode, TransitionMode::CleanPivot);
    }

    #[test]
    fn test_engagement_extends_within_ceiling_only() {
        let config = config();
        let mut state = ConversationState::new("c1", &config);
        let supervisor = Supervisor::default();

        // Base 2 spent on rich answers: first grants the bonus
        supervisor.assess_turn(&config, &mut state, &rich_answer());
        let second = supervisor.assess_turn(&config, &mut state, &rich_answer());
        assert_eq!(second.directive, Directive::DeepenTopic);
        assert_eq!(state.budget.allowed_turns(), 3);

        // Max 3 reached: the ceiling wins over continued engagement
        let third = supervisor.assess_turn(&config, &mut state, &rich_answer());
        assert_eq!(third.directive, Directive::NextTopic);
        assert!(third.flow_flags.deep_offer_closure_intercepted);
    }

    #[test]
    fn test_budget_ceiling_holds_under_repeated_steps() {
        let config = config();
        let mut state = ConversationState::new("c1", &config);
        let supervisor = Supervisor::default();
        for _ in 0..20 {
            supervisor.assess_turn(&config, &mut state, &rich_answer());
            assert!(state.budget.turns_used <= state.budget.max_turns);
        }
    }

    #[test]
    fn test_clarification_suspends_progression() {
        let config = config();
        let mut state = ConversationState::new("c1", &config);
        let insight =
            Supervisor::default().assess_turn(&config, &mut state, "What do you mean by that?");
        assert_eq!(insight.directive, Directive::HandleClarification);
        assert_eq!(state.budget.turns_used, 0);
        assert_eq!(state.topic_index, 0);
    }

    #[test]
    fn test_off_topic_suspends_progression() {
        let config = config();
        let mut state = ConversationState::new("c1", &config);
        let insight =
            Supervisor::default().assess_turn(&config, &mut state, "Are you a bot?");
        assert_eq!(insight.directive, Directive::HandleOffTopic);
        assert_eq!(state.budget.turns_used, 0);
    }

    #[test]
    fn test_completion_guard_routes_to_consent_first() {
        let config = config();
        let mut state = ConversationState::new("c1", &config);
        state.topic_index = 1;
        state.budget.turns_used = state.budget.max_turns;

        let insight = Supervisor::default().assess_turn(
            &config,
            &mut state,
            "That covers everything I wanted to say about pricing",
        );
        assert_eq!(insight.directive, Directive::BeginConsent);
        assert_eq!(state.phase, Phase::ConsentCollection);
        assert!(insight.flow_flags.completion_guard_intercepted);
        assert!(insight.flow_flags.completion_blocked_for_consent);
        assert!(!insight.flow_flags.completion_blocked_for_missing_field);
    }

    #[test]
    fn test_completion_guard_routes_to_missing_field() {
        let config = config();
        let mut state = ConversationState::new("c1", &config);
        state.topic_index = 1;
        state.budget.turns_used = state.budget.max_turns;
        state.consent_collected = true;

        let insight = Supervisor::default().assess_turn(
            &config,
            &mut state,
            "That covers everything I wanted to say about pricing",
        );
        assert_eq!(insight.directive, Directive::CollectField);
        assert_eq!(insight.target_field.as_deref(), Some("email"));
        assert!(insight.flow_flags.completion_blocked_for_missing_field);
        assert_eq!(state.phase, Phase::FieldCollection);
    }

    #[test]
    fn test_consent_yes_then_field_then_close() {
        let config = config();
        let mut state = ConversationState::new("c1", &config);
        state.phase = Phase::ConsentCollection;
        let supervisor = Supervisor::default();

        let insight = supervisor.assess_turn(&config, &mut state, "Yes, that's fine");
        assert!(state.consent_collected);
        assert_eq!(insight.directive, Directive::CollectField);
        assert_eq!(state.phase, Phase::FieldCollection);

        let insight = supervisor.assess_turn(&config, &mut state, "mario@example.com");
        assert_eq!(insight.directive, Directive::Conclude);
        assert_eq!(state.phase, Phase::Closing);
        assert!(state.collected_fields.contains(&"email".to_string()));
    }

    #[test]
    fn test_consent_declined_concludes() {
        let config = config();
        let mut state = ConversationState::new("c1", &config);
        state.phase = Phase::ConsentCollection;

        let insight = Supervisor::default().assess_turn(&config, &mut state, "No, rather not");
        assert_eq!(insight.directive, Directive::Conclude);
        assert_eq!(state.phase, Phase::Closing);
        assert!(!state.consent_collected);
    }

    #[test]
    fn test_ambiguous_consent_reasks() {
        let config = config();
        let mut state = ConversationState::new("c1", &config);
        state.phase = Phase::ConsentCollection;

        let insight = Supervisor::default().assess_turn(&config, &mut state, "maybe later");
        assert_eq!(insight.directive, Directive::BeginConsent);
        assert_eq!(state.phase, Phase::ConsentCollection);
    }

    #[test]
    fn test_italian_consent_affirmative() {
        assert!(is_affirmative("Sì, va bene", Language::Italian));
        assert!(is_affirmative("certo!", Language::Italian));
        assert!(!is_affirmative("non direi", Language::Italian));
        assert!(!is_affirmative("no grazie", Language::Italian));
    }

    #[test]
    fn test_session_cap_forces_completion() {
        let config = config();
        let mut state = ConversationState::new("c1", &config);
        state.total_turns = config.max_total_turns - 1;

        let insight = Supervisor::default().assess_turn(
            &config,
            &mut state,
            "We keep losing customers after renewals each quarter",
        );
        assert_eq!(insight.directive, Directive::BeginConsent);
        assert!(insight.flow_flags.completion_guard_intercepted);
    }

    #[test]
    fn test_degrades_without_topics() {
        let config = BotConfig::new("bot-1", "en", "General feedback")
            .with_topic_budget(TopicBudget::new(1, 1, 2).unwrap());
        let mut state = ConversationState::new("c1", &config);
        let supervisor = Supervisor::default();

        let insight = supervisor.assess_turn(&config, &mut state, "It works well enough for us");
        assert!(insight.target_topic.is_none());
        // No topics to advance through: budget exhaustion goes straight
        // to completion sequencing
        let insight = supervisor.assess_turn(&config, &mut state, "Nothing else to add really");
        assert_eq!(insight.directive, Directive::BeginConsent);
    }
}
