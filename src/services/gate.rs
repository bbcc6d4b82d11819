//! Quality Gate & Turn Engine
//!
//! The gate decides, per assistant turn, whether the candidate response is
//! eligible for evaluation, scores it against a deterministic rubric, and
//! reports which checks failed so a regeneration can be steered. The turn
//! engine wires the whole per-turn pipeline together: classifier,
//! supervisor, prompt builder, provider call, gate, one regeneration, and
//! the deterministic fallback, then persists the finalized message with
//! its complete telemetry.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use interview_core::{Language, MessageMetadata, Phase, QualityTelemetry};
use interview_llm::{ChatMessage, LlmProvider, LlmRequest, UsageEvent, UsageReporter};

use super::anchors::{build_message_anchors, build_topic_anchors, AnchorSet};
use super::bridge::{
    build_runtime_semantic_context_prompt, build_soft_diagnostic_hint, collect_recent_bridge_stems,
    RuntimeContext, MAX_BRIDGE_STEMS,
};
use super::fallback::{
    generate_consent_question_only, generate_field_question_only, normalize_single_question,
};
use super::supervisor::{Directive, Supervisor, SupervisorInsight};
use crate::models::{BotConfig, ConversationState, FieldSpec, Message, MessageRole};
use crate::storage::MessageStore;
use crate::utils::error::{AppError, AppResult};

/// Score at or above which a candidate passes the gate
pub const PASS_BAR: f64 = 0.6;

/// Word bounds for an acceptable open-phase question
const MIN_QUESTION_WORDS: usize = 5;
const MAX_QUESTION_WORDS: usize = 60;

/// History tail sent to the provider per turn
const HISTORY_WINDOW: usize = 12;

/// Rubric checks, each worth an equal share of the score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateCheck {
    /// Exactly one question mark
    SingleQuestion,
    /// Word count within bounds
    LengthBounds,
    /// Does not open with a banned generic phrase
    FreshOpener,
    /// Not a repeat of the previous assistant question
    NotRepeated,
    /// Shares at least one anchor root with the target topic
    OnAnchor,
}

impl GateCheck {
    const ALL: [GateCheck; 5] = [
        GateCheck::SingleQuestion,
        GateCheck::LengthBounds,
        GateCheck::FreshOpener,
        GateCheck::NotRepeated,
        GateCheck::OnAnchor,
    ];

    /// Constraint injected into the regeneration prompt when this check fails
    fn constraint(&self, language: Language) -> &'static str {
        match (language, self) {
            (Language::English, Self::SingleQuestion) => "Ask exactly one question.",
            (Language::English, Self::LengthBounds) => {
                "Keep the question between one and three short sentences."
            }
            (Language::English, Self::FreshOpener) => {
                "Do not open with a generic acknowledgment."
            }
            (Language::English, Self::NotRepeated) => {
                "Ask something different from your previous question."
            }
            (Language::English, Self::OnAnchor) => "Stay on the current topic.",
            (Language::Italian, Self::SingleQuestion) => "Fai esattamente una domanda.",
            (Language::Italian, Self::LengthBounds) => {
                "Mantieni la domanda tra una e tre frasi brevi."
            }
            (Language::Italian, Self::FreshOpener) => {
                "Non aprire con un riconoscimento generico."
            }
            (Language::Italian, Self::NotRepeated) => {
                "Fai una domanda diversa dalla tua precedente."
            }
            (Language::Italian, Self::OnAnchor) => "Resta sul tema attuale.",
        }
    }
}

/// Evaluation context for one candidate
#[derive(Debug, Clone, Copy, Default)]
pub struct GateContext<'a> {
    pub phase: Phase,
    pub language: Language,
    /// Anchors of the topic the question should target; None degrades the
    /// on-anchor check to a pass
    pub topic_anchors: Option<&'a AnchorSet>,
    pub last_assistant_question: Option<&'a str>,
}

/// Outcome of one gate evaluation
#[derive(Debug, Clone)]
pub struct GateOutcome {
    pub eligible: bool,
    pub evaluated: bool,
    pub score: f64,
    pub passed: bool,
    pub failed_checks: Vec<GateCheck>,
}

impl GateOutcome {
    fn not_evaluated(eligible: bool) -> Self {
        Self {
            eligible,
            evaluated: false,
            score: 0.0,
            passed: false,
            failed_checks: Vec::new(),
        }
    }

    /// Regeneration constraints for the failed checks
    pub fn feedback(&self, language: Language) -> String {
        self.failed_checks
            .iter()
            .map(|c| c.constraint(language))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Deterministic rubric over candidate assistant turns
#[derive(Debug, Clone, Default)]
pub struct QualityGate;

impl QualityGate {
    /// Score a candidate. Only open phases are eligible; everything else
    /// returns an unevaluated outcome.
    pub fn evaluate(&self, candidate: &str, ctx: &GateContext<'_>) -> GateOutcome {
        if !ctx.phase.is_open() {
            return GateOutcome::not_evaluated(false);
        }

        let mut failed = Vec::new();
        for check in GateCheck::ALL {
            if !self.check(check, candidate, ctx) {
                failed.push(check);
            }
        }

        let total = GateCheck::ALL.len();
        let score = (total - failed.len()) as f64 / total as f64;
        GateOutcome {
            eligible: true,
            evaluated: true,
            score,
            passed: score >= PASS_BAR,
            failed_checks: failed,
        }
    }

    fn check(&self, check: GateCheck, candidate: &str, ctx: &GateContext<'_>) -> bool {
        match check {
            GateCheck::SingleQuestion => candidate.matches('?').count() == 1,
            GateCheck::LengthBounds => {
                let words = candidate.split_whitespace().count();
                (MIN_QUESTION_WORDS..=MAX_QUESTION_WORDS).contains(&words)
            }
            GateCheck::FreshOpener => {
                let lower = candidate.trim().to_lowercase();
                !ctx.language
                    .pack()
                    .generic_openers
                    .iter()
                    .any(|opener| lower.starts_with(opener))
            }
            GateCheck::NotRepeated => match ctx.last_assistant_question {
                Some(previous) => {
                    normalize_for_comparison(candidate) != normalize_for_comparison(previous)
                }
                None => true,
            },
            GateCheck::OnAnchor => match ctx.topic_anchors {
                Some(topic) if !topic.is_empty() => {
                    let candidate_anchors = build_message_anchors(candidate, ctx.language);
                    topic.overlaps(&candidate_anchors)
                }
                // No topic data: degrade to pass rather than reject
                _ => true,
            },
        }
    }
}

fn normalize_for_comparison(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// The per-turn pipeline: classifier, supervisor, builder, provider, gate,
/// regeneration, fallback, persistence.
pub struct TurnEngine {
    provider: Arc<dyn LlmProvider>,
    reporter: Arc<dyn UsageReporter>,
    store: MessageStore,
    supervisor: Supervisor,
    gate: QualityGate,
}

impl TurnEngine {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        reporter: Arc<dyn UsageReporter>,
        store: MessageStore,
    ) -> Self {
        Self {
            provider,
            reporter,
            store,
            supervisor: Supervisor::default(),
            gate: QualityGate,
        }
    }

    /// Process one user turn end to end and return the persisted assistant
    /// message.
    ///
    /// The assistant row is written only after the turn fully resolves;
    /// an error anywhere leaves no partial assistant metadata behind.
    pub async fn run_turn(
        &self,
        config: &BotConfig,
        state: &mut ConversationState,
        user_message: &str,
    ) -> AppResult<Message> {
        let language = config.language;

        self.store.append_message(&Message {
            id: Uuid::new_v4().to_string(),
            conversation_id: state.conversation_id.clone(),
            bot_id: config.bot_id.clone(),
            role: MessageRole::User,
            content: user_message.to_string(),
            metadata: MessageMetadata::default(),
            created_at: Utc::now().to_rfc3339(),
        })?;

        let history = self.store.get_conversation_messages(&state.conversation_id)?;
        let prior_question = state.last_assistant_question.clone();
        let insight = self.supervisor.assess_turn(config, state, user_message);
        debug!(
            directive = ?insight.directive,
            phase = %state.phase,
            "Supervisor decision"
        );

        let topic_anchors = insight
            .target_topic
            .as_ref()
            .map(|t| build_topic_anchors(&t.label, language));
        let stems = collect_recent_bridge_stems(&history, MAX_BRIDGE_STEMS);
        let system_prompt = self.build_system_prompt(
            config,
            &insight,
            prior_question.as_deref(),
            user_message,
            &stems,
            state.phase,
        );

        let request = LlmRequest::new(chat_history(&history))
            .with_system(system_prompt.clone());

        let gate_ctx = GateContext {
            phase: state.phase,
            language,
            topic_anchors: topic_anchors.as_ref(),
            last_assistant_question: prior_question.as_deref(),
        };

        let resolved = self
            .generate_and_gate(config, &insight, request, &system_prompt, &gate_ctx)
            .await?;

        let mut quality = resolved.quality;
        quality.normalize();

        let assistant = Message {
            id: Uuid::new_v4().to_string(),
            conversation_id: state.conversation_id.clone(),
            bot_id: config.bot_id.clone(),
            role: MessageRole::Assistant,
            content: resolved.content.clone(),
            metadata: MessageMetadata {
                quality: Some(quality),
                flow_flags: Some(insight.flow_flags),
                model_id: resolved.model_id,
            },
            created_at: Utc::now().to_rfc3339(),
        };
        self.store.append_message(&assistant)?;
        state.last_assistant_question = Some(resolved.content);

        Ok(assistant)
    }

    async fn generate_and_gate(
        &self,
        config: &BotConfig,
        insight: &SupervisorInsight,
        request: LlmRequest,
        system_prompt: &str,
        gate_ctx: &GateContext<'_>,
    ) -> AppResult<ResolvedTurn> {
        let language = config.language;
        // A thrown provider call gets one retry with the unchanged request
        // before any fallback or turn-level failure
        let first = match self.provider.generate_text(request.clone()).await {
            Ok(response) => response,
            Err(first_err) => {
                debug!(error = %first_err, "Generation threw, retrying once");
                match self.provider.generate_text(request.clone()).await {
                    Ok(response) => response,
                    Err(e) => {
                        // Consent/field turns have a deterministic escape
                        // hatch; open-phase generation failure is terminal
                        if let Some(fallback) = self.fallback_for(config, insight).await {
                            warn!(error = %e, "Generation failed twice, using deterministic fallback");
                            return Ok(ResolvedTurn {
                                content: fallback,
                                model_id: None,
                                quality: QualityTelemetry {
                                    eligible: gate_ctx.phase.is_open(),
                                    fallback_used: true,
                                    ..Default::default()
                                },
                            });
                        }
                        return Err(AppError::from(e));
                    }
                }
            }
        };
        self.report_usage("turn_generation", &first.model_id, first.usage);

        let outcome = self.gate.evaluate(&first.content, gate_ctx);
        if !outcome.evaluated || outcome.passed {
            let content = self.shape_closed_phase(insight, first.content);
            return Ok(ResolvedTurn {
                content,
                model_id: Some(first.model_id),
                quality: QualityTelemetry {
                    eligible: outcome.eligible,
                    evaluated: outcome.evaluated,
                    score: Some(outcome.score),
                    passed: Some(outcome.passed),
                    ..Default::default()
                },
            });
        }

        debug!(score = outcome.score, "Gate rejected candidate, regenerating");
        let constrained_system =
            format!("{}\n## Corrections\n{}", system_prompt, outcome.feedback(language));
        let retry_request = LlmRequest {
            system: Some(constrained_system),
            ..request
        };

        match self.provider.generate_text(retry_request).await {
            Ok(second) => {
                self.report_usage("turn_regeneration", &second.model_id, second.usage);
                let second_outcome = self.gate.evaluate(&second.content, gate_ctx);

                // Keep whichever candidate scored better; a still-failing
                // turn is persisted as failed, not hidden
                let (content, model_id, score, passed) =
                    if second_outcome.score >= outcome.score {
                        (
                            second.content,
                            second.model_id,
                            second_outcome.score,
                            second_outcome.passed,
                        )
                    } else {
                        (first.content, first.model_id, outcome.score, outcome.passed)
                    };

                Ok(ResolvedTurn {
                    content,
                    model_id: Some(model_id),
                    quality: QualityTelemetry {
                        eligible: true,
                        evaluated: true,
                        score: Some(score),
                        passed: Some(passed),
                        gate_triggered: true,
                        regenerated: true,
                        fallback_used: false,
                    },
                })
            }
            Err(e) => {
                warn!(error = %e, "Regeneration failed, keeping first candidate");
                Ok(ResolvedTurn {
                    content: first.content,
                    model_id: Some(first.model_id),
                    quality: QualityTelemetry {
                        eligible: true,
                        evaluated: true,
                        score: Some(outcome.score),
                        passed: Some(outcome.passed),
                        gate_triggered: true,
                        regenerated: true,
                        fallback_used: false,
                    },
                })
            }
        }
    }

    /// Deterministic fallback question for consent/field directives
    async fn fallback_for(
        &self,
        config: &BotConfig,
        insight: &SupervisorInsight,
    ) -> Option<String> {
        match insight.directive {
            Directive::BeginConsent => Some(
                generate_consent_question_only(
                    self.provider.as_ref(),
                    self.reporter.as_ref(),
                    config.language,
                    &config.objective,
                )
                .await,
            ),
            Directive::CollectField => {
                let field = self.resolve_field(config, insight);
                Some(
                    generate_field_question_only(
                        self.provider.as_ref(),
                        self.reporter.as_ref(),
                        config.language,
                        &field,
                    )
                    .await,
                )
            }
            _ => None,
        }
    }

    fn resolve_field(&self, config: &BotConfig, insight: &SupervisorInsight) -> FieldSpec {
        insight
            .target_field
            .as_ref()
            .and_then(|name| config.fields.iter().find(|f| &f.name == name))
            .cloned()
            .unwrap_or_else(|| FieldSpec::required("info", "the missing information"))
    }

    /// Consent and field questions are never free-form shaped: force the
    /// single-question contract even when the gate did not evaluate.
    fn shape_closed_phase(&self, insight: &SupervisorInsight, content: String) -> String {
        match insight.directive {
            Directive::BeginConsent | Directive::CollectField => {
                normalize_single_question(&content)
            }
            _ => content,
        }
    }

    fn build_system_prompt(
        &self,
        config: &BotConfig,
        insight: &SupervisorInsight,
        prior_question: Option<&str>,
        user_message: &str,
        stems: &[String],
        phase: Phase,
    ) -> String {
        let language = config.language;
        let mut prompt = match language {
            Language::Italian => format!(
                "Sei un intervistatore professionale. Obiettivo dell'intervista: {}.\n\
                 Rispondi sempre in italiano, con un solo messaggio breve.\n",
                config.objective
            ),
            Language::English => format!(
                "You are a professional interviewer. Interview objective: {}.\n\
                 Always reply in English, with a single short message.\n",
                config.objective
            ),
        };

        prompt.push_str(directive_instruction(insight, language).as_str());

        let ctx = RuntimeContext {
            phase,
            transition_mode: insight.transition_mode,
            depth: insight.depth,
            target_topic_label: insight.target_topic.as_ref().map(|t| t.label.as_str()),
            last_user_message: Some(user_message),
            prior_assistant_question: prior_question,
            recent_stems: stems,
        };
        let context_block = build_runtime_semantic_context_prompt(language, &ctx);
        if !context_block.is_empty() {
            prompt.push('\n');
            prompt.push_str(&context_block);
        }

        if matches!(
            insight.directive,
            Directive::StayOnTopic | Directive::DeepenTopic | Directive::NextTopic
        ) {
            let hint = build_soft_diagnostic_hint(user_message, language);
            if !hint.is_empty() {
                prompt.push_str(&hint);
            }
        }

        prompt
    }

    fn report_usage(&self, label: &str, model_id: &str, usage: interview_llm::TokenUsage) {
        self.reporter.report(&UsageEvent {
            provider: self.provider.name().to_string(),
            model_id: model_id.to_string(),
            label: label.to_string(),
            usage,
        });
    }
}

/// Final text plus the telemetry bookkeeping accumulated while resolving it
struct ResolvedTurn {
    content: String,
    model_id: Option<String>,
    quality: QualityTelemetry,
}

fn directive_instruction(insight: &SupervisorInsight, language: Language) -> String {
    let topic = insight
        .target_topic
        .as_ref()
        .map(|t| t.label.as_str())
        .unwrap_or_default();
    match language {
        Language::English => match insight.directive {
            Directive::StayOnTopic => {
                format!("Ask the next question about: {}.\n", topic)
            }
            Directive::DeepenTopic => {
                format!("Go one level deeper on: {}.\n", topic)
            }
            Directive::NextTopic => {
                format!("Move the conversation to the next topic: {}.\n", topic)
            }
            Directive::HandleClarification => {
                "The user did not understand. Briefly restate your previous question in \
                 simpler words, then stop.\n"
                    .to_string()
            }
            Directive::HandleOffTopic => {
                "The user asked something unrelated. Acknowledge it in a few words without \
                 answering at length, then steer back to the interview with one question.\n"
                    .to_string()
            }
            Directive::BeginConsent => {
                "Ask exactly one yes/no question: whether the user agrees to their answers \
                 being stored. Nothing else.\n"
                    .to_string()
            }
            Directive::CollectField => {
                format!(
                    "Ask exactly one question requesting: {}. Nothing else.\n",
                    insight.target_field.as_deref().unwrap_or("the missing information")
                )
            }
            Directive::Conclude => {
                "The interview is over. Thank the user warmly in one or two sentences. \
                 Do not ask any further question.\n"
                    .to_string()
            }
        },
        Language::Italian => match insight.directive {
            Directive::StayOnTopic => {
                format!("Fai la prossima domanda su: {}.\n", topic)
            }
            Directive::DeepenTopic => {
                format!("Vai un livello più a fondo su: {}.\n", topic)
            }
            Directive::NextTopic => {
                format!("Sposta la conversazione sul prossimo tema: {}.\n", topic)
            }
            Directive::HandleClarification => {
                "L'utente non ha capito. Riformula brevemente la tua domanda precedente con \
                 parole più semplici, poi fermati.\n"
                    .to_string()
            }
            Directive::HandleOffTopic => {
                "L'utente ha chiesto qualcosa di non pertinente. Prendine atto in poche \
                 parole senza rispondere a lungo, poi riporta l'intervista con una domanda.\n"
                    .to_string()
            }
            Directive::BeginConsent => {
                "Fai esattamente una domanda sì/no: se l'utente acconsente alla \
                 conservazione delle sue risposte. Nient'altro.\n"
                    .to_string()
            }
            Directive::CollectField => {
                format!(
                    "Fai esattamente una domanda per chiedere: {}. Nient'altro.\n",
                    insight.target_field.as_deref().unwrap_or("il dato mancante")
                )
            }
            Directive::Conclude => {
                "L'intervista è finita. Ringrazia calorosamente in una o due frasi. Non \
                 fare altre domande.\n"
                    .to_string()
            }
        },
    }
}

/// Convert the stored history tail into provider chat messages
fn chat_history(history: &[Message]) -> Vec<ChatMessage> {
    history
        .iter()
        .rev()
        .take(HISTORY_WINDOW)
        .rev()
        .map(|m| match m.role {
            MessageRole::User => ChatMessage::user(m.content.clone()),
            MessageRole::Assistant => ChatMessage::assistant(m.content.clone()),
        })
        .collect()
}
