//! Response/Bridge Builder
//!
//! Pure prompt-construction functions. Everything here computes text
//! blocks injected into the LLM prompt for the next assistant turn; the
//! conversational text itself remains the model's output. No function in
//! this module persists anything or performs I/O.

use interview_core::{excerpt, Language, Phase, ResponseDepth, TransitionMode};

use super::anchors::AnchorSet;
use super::signals::{is_clarification_signal, word_count};
use crate::models::{Message, MessageRole};

/// Default cap on recent bridge stems fed into the anti-repetition block
pub const MAX_BRIDGE_STEMS: usize = 4;

/// Minimum words before a user message justifies a diagnostic pivot
const MIN_DIAGNOSTIC_WORDS: usize = 5;

/// Minimum words before a user message can serve as bridge material
const MIN_SNIPPET_WORDS: usize = 4;

/// Diagnostic lens the next question may apply to the user's last answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLens {
    /// Ask for a concrete example
    Example,
    /// Ask what the effect/outcome was
    Impact,
    /// Ask what matters most among the things mentioned
    Priority,
    /// Ask what they did or plan to do about it
    Action,
}

/// Inputs for the runtime semantic-context block
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeContext<'a> {
    pub phase: Phase,
    pub transition_mode: TransitionMode,
    pub depth: ResponseDepth,
    /// Label of the topic the next question targets
    pub target_topic_label: Option<&'a str>,
    /// The user's most recent message
    pub last_user_message: Option<&'a str>,
    /// The previous assistant question, to avoid repeating it
    pub prior_assistant_question: Option<&'a str>,
    /// Normalized stems of recent assistant openings, most recent first
    pub recent_stems: &'a [String],
}

/// Assemble the per-turn semantic-context instruction block.
///
/// Returns an empty string when there is no prior user message: with
/// nothing to bridge from, injecting constraints would only push the
/// model toward generic phrasing.
pub fn build_runtime_semantic_context_prompt(language: Language, ctx: &RuntimeContext<'_>) -> String {
    let last_user = match ctx.last_user_message.map(str::trim) {
        Some(text) if !text.is_empty() => text,
        _ => return String::new(),
    };

    let pack = language.pack();
    let snippet = excerpt(last_user, 180);
    let mut block = String::new();

    match language {
        Language::Italian => {
            block.push_str("## Contesto del turno\n");
            block.push_str(&format!("Fase attiva: {}\n", ctx.phase.as_str()));
            if let Some(label) = ctx.target_topic_label {
                block.push_str(&format!("Tema da esplorare: {}\n", label));
            }
            block.push_str(&format!("Ultima risposta dell'utente: \"{}\"\n", snippet));
            if let Some(prior) = ctx.prior_assistant_question {
                block.push_str(&format!(
                    "Domanda precedente (NON ripeterla né riformularla): \"{}\"\n",
                    excerpt(prior, 140)
                ));
            }
            block.push_str(depth_instruction_it(ctx.depth));
            block.push_str(transition_instruction_it(ctx.transition_mode));
            block.push_str(&format!(
                "Non iniziare con aperture generiche come: {}.\n",
                pack.generic_openers.join(", ")
            ));
            if !ctx.recent_stems.is_empty() {
                let stems: Vec<&str> = ctx
                    .recent_stems
                    .iter()
                    .take(MAX_BRIDGE_STEMS)
                    .map(|s| s.as_str())
                    .collect();
                block.push_str(&format!(
                    "Evita di aprire come nei turni recenti: {}.\n",
                    stems.join(" | ")
                ));
            }
        }
        Language::English => {
            block.push_str("## Turn context\n");
            block.push_str(&format!("Active phase: {}\n", ctx.phase.as_str()));
            if let Some(label) = ctx.target_topic_label {
                block.push_str(&format!("Topic to explore: {}\n", label));
            }
            block.push_str(&format!("User's last answer: \"{}\"\n", snippet));
            if let Some(prior) = ctx.prior_assistant_question {
                block.push_str(&format!(
                    "Previous question (do NOT repeat or rephrase it): \"{}\"\n",
                    excerpt(prior, 140)
                ));
            }
            block.push_str(depth_instruction_en(ctx.depth));
            block.push_str(transition_instruction_en(ctx.transition_mode));
            block.push_str(&format!(
                "Do not open with generic phrases such as: {}.\n",
                pack.generic_openers.join(", ")
            ));
            if !ctx.recent_stems.is_empty() {
                let stems: Vec<&str> = ctx
                    .recent_stems
                    .iter()
                    .take(MAX_BRIDGE_STEMS)
                    .map(|s| s.as_str())
                    .collect();
                block.push_str(&format!(
                    "Avoid opening the way recent turns did: {}.\n",
                    stems.join(" | ")
                ));
            }
        }
    }

    block
}

fn depth_instruction_en(depth: ResponseDepth) -> &'static str {
    match depth {
        ResponseDepth::Brief => {
            "The answer was brief: ask one easy, concrete question to draw them out.\n"
        }
        ResponseDepth::Balanced => {
            "The answer had some substance: pick its most specific detail and go one level deeper.\n"
        }
        ResponseDepth::Rich => {
            "The answer was rich: do not ask for more breadth, narrow in on the single most important thread.\n"
        }
    }
}

fn depth_instruction_it(depth: ResponseDepth) -> &'static str {
    match depth {
        ResponseDepth::Brief => {
            "La risposta era breve: fai una domanda semplice e concreta per far parlare di più.\n"
        }
        ResponseDepth::Balanced => {
            "La risposta aveva sostanza: prendi il dettaglio più specifico e vai un livello più a fondo.\n"
        }
        ResponseDepth::Rich => {
            "La risposta era ricca: non allargare, restringi sul filo più importante.\n"
        }
    }
}

fn transition_instruction_en(mode: TransitionMode) -> &'static str {
    match mode {
        TransitionMode::Continuity => "Stay on the current thread.\n",
        TransitionMode::Bridge => {
            "You are changing topic: explicitly tie the new question back to something the user just said.\n"
        }
        TransitionMode::CleanPivot => {
            "You are changing topic: pivot cleanly to the new topic without forcing a connection to the last answer.\n"
        }
    }
}

fn transition_instruction_it(mode: TransitionMode) -> &'static str {
    match mode {
        TransitionMode::Continuity => "Resta sul filo attuale.\n",
        TransitionMode::Bridge => {
            "Stai cambiando tema: collega esplicitamente la nuova domanda a qualcosa che l'utente ha appena detto.\n"
        }
        TransitionMode::CleanPivot => {
            "Stai cambiando tema: passa al nuovo tema in modo pulito, senza forzare un collegamento con l'ultima risposta.\n"
        }
    }
}

/// Suggest one diagnostic lens for the next question, or nothing.
///
/// Clarification turns and very short messages carry too little signal to
/// justify a diagnostic pivot and yield an empty string.
pub fn build_soft_diagnostic_hint(last_user_message: &str, language: Language) -> String {
    let words = word_count(last_user_message);
    if words < MIN_DIAGNOSTIC_WORDS || is_clarification_signal(last_user_message, language) {
        return String::new();
    }

    let lens = choose_diagnostic_lens(last_user_message, language);
    lens_instruction(lens, language).to_string()
}

/// Pick the lens by lightweight keyword heuristics on the user's message
pub fn choose_diagnostic_lens(last_user_message: &str, language: Language) -> DiagnosticLens {
    let pack = language.pack();
    let lower = last_user_message.to_lowercase();
    let words = word_count(&lower);

    if pack.action_markers.iter().any(|m| lower.contains(m)) {
        return DiagnosticLens::Action;
    }
    if pack.priority_markers.iter().any(|m| lower.contains(m)) || words >= 35 {
        return DiagnosticLens::Priority;
    }
    if pack.impact_markers.iter().any(|m| lower.contains(m)) || words >= 11 {
        return DiagnosticLens::Impact;
    }
    DiagnosticLens::Example
}

fn lens_instruction(lens: DiagnosticLens, language: Language) -> &'static str {
    match (language, lens) {
        (Language::English, DiagnosticLens::Example) => {
            "If natural, ask for one concrete example of what they described.\n"
        }
        (Language::English, DiagnosticLens::Impact) => {
            "If natural, ask what effect this had, ideally something measurable.\n"
        }
        (Language::English, DiagnosticLens::Priority) => {
            "If natural, ask which of the things they mentioned matters most.\n"
        }
        (Language::English, DiagnosticLens::Action) => {
            "If natural, ask what they did (or plan to do) about the problem they described.\n"
        }
        (Language::Italian, DiagnosticLens::Example) => {
            "Se naturale, chiedi un esempio concreto di quello che hanno descritto.\n"
        }
        (Language::Italian, DiagnosticLens::Impact) => {
            "Se naturale, chiedi che effetto ha avuto, possibilmente misurabile.\n"
        }
        (Language::Italian, DiagnosticLens::Priority) => {
            "Se naturale, chiedi quale tra le cose citate conta di più.\n"
        }
        (Language::Italian, DiagnosticLens::Action) => {
            "Se naturale, chiedi cosa hanno fatto (o intendono fare) rispetto al problema descritto.\n"
        }
    }
}

/// Extract the opening clause of an assistant message, normalized for
/// comparison: lowercase, whitespace collapsed, cut at the first sentence
/// terminator.
fn normalize_stem(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return None;
    }
    let clause_end = trimmed
        .find(['.', '!', '?', ':', '\n'])
        .unwrap_or(trimmed.len());
    let clause = trimmed[..clause_end].trim();
    if clause.is_empty() {
        return None;
    }
    let normalized = clause
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    // A stem longer than a short clause is the whole question, not an
    // opening habit worth banning
    Some(excerpt(&normalized, 60))
}

/// Collect up to `limit` distinct normalized opening stems from recent
/// assistant messages, most recent first.
///
/// Used to stop consecutive turns from all starting "I see... / Capisco...".
pub fn collect_recent_bridge_stems(messages: &[Message], limit: usize) -> Vec<String> {
    let mut stems: Vec<String> = Vec::new();
    for message in messages.iter().rev() {
        if stems.len() >= limit {
            break;
        }
        if message.role != MessageRole::Assistant {
            continue;
        }
        if let Some(stem) = normalize_stem(&message.content) {
            if !stems.contains(&stem) {
                stems.push(stem);
            }
        }
    }
    stems
}

/// Derive a natural-language reference to a topic from its anchors.
///
/// The longest anchor wins as the most specific; with no anchors the
/// language's generic cue ("this topic" / "questo tema") is used.
pub fn build_natural_topic_cue(anchors: &AnchorSet, language: Language) -> String {
    anchors
        .most_specific()
        .map(|a| a.to_lowercase())
        .unwrap_or_else(|| language.pack().generic_topic_cue.to_string())
}

/// Whether the user's text can anchor a bridge.
///
/// Rejects degenerate material: too short, a clarification signal, or
/// low-information boilerplate ("I already told you", "ok").
pub fn is_usable_bridge_snippet(text: &str, language: Language) -> bool {
    let trimmed = text.trim();
    if word_count(trimmed) < MIN_SNIPPET_WORDS {
        return false;
    }
    if is_clarification_signal(trimmed, language) {
        return false;
    }

    let lower = trimmed.to_lowercase();
    let pack = language.pack();
    for entry in pack.bridge_boilerplate {
        let matched = if entry.contains(' ') {
            lower.contains(entry)
        } else {
            lower == *entry
        };
        if matched {
            return false;
        }
    }
    true
}
