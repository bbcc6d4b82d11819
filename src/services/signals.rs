//! Turn Signal Classifier
//!
//! Per-turn heuristics over the user's message: clarification requests,
//! off-topic questions, and response depth. Every function here is total
//! and fails closed to the least disruptive classification (`None`) on
//! ambiguous input; classification ambiguity is never an error.
//!
//! Off-topic detection only runs in open phases. Consent and
//! field-collection turns are expected to be terse, so flagging them
//! would fight the sequencing the supervisor is driving.

use interview_core::{Language, Phase, ResponseDepth, UserTurnSignal};

use super::anchors::{build_message_anchors, AnchorSet};

/// Word-count cap for the short either/or question heuristic
const EITHER_OR_MAX_WORDS: usize = 8;

/// Word-count cap for the short meta-question heuristic
const META_QUESTION_MAX_WORDS: usize = 8;

/// Count whitespace-separated words
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Bucket the user's response by length alone
pub fn classify_response_depth(text: &str) -> ResponseDepth {
    ResponseDepth::from_word_count(word_count(text))
}

/// Whether the user is asking what the question meant, or giving a bare
/// filler non-answer.
///
/// Matches: very short filler tokens ("ok", "boh", a bare "?"), explicit
/// clarification phrasing from the language pack, or a short either/or
/// question ("intensiva o estensiva?").
pub fn is_clarification_signal(text: &str, language: Language) -> bool {
    let pack = language.pack();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }
    let lower = trimmed.to_lowercase();

    // Bare filler, with trailing punctuation tolerated ("ok?", "boh...")
    let stripped = lower.trim_end_matches(['?', '!', '.', ',']);
    let candidate = if stripped.is_empty() { lower.as_str() } else { stripped };
    if word_count(candidate) <= 2 && pack.filler_tokens.iter().any(|t| *t == candidate) {
        return true;
    }

    // Explicit clarification phrasing
    if pack
        .clarification_phrases
        .iter()
        .any(|phrase| lower.contains(phrase))
    {
        return true;
    }

    // Short either/or question: the user is choosing between readings of
    // the question, not answering it
    if lower.contains('?')
        && word_count(&lower) <= EITHER_OR_MAX_WORDS
        && lower.contains(pack.either_or_conjunction)
    {
        return true;
    }

    false
}

/// Whether the text reads as a question: contains a question mark or
/// starts with an interrogative word.
pub fn is_likely_user_question(text: &str, language: Language) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }
    if trimmed.contains('?') {
        return true;
    }

    let first_word = trimmed
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_lowercase();
    let first_word = first_word.trim_end_matches(['?', '!', '.', ',']);
    language
        .pack()
        .interrogative_leads
        .iter()
        .any(|lead| *lead == first_word)
}

/// Topic context the classifier compares the user's message against
#[derive(Debug, Clone, Copy, Default)]
pub struct TurnSignalContext<'a> {
    /// Anchors of the topic currently being explored
    pub current_topic: Option<&'a AnchorSet>,
    /// Anchors of the topic the supervisor would move to next
    pub target_topic: Option<&'a AnchorSet>,
    /// Anchors of the interview objective
    pub objective: Option<&'a AnchorSet>,
}

impl<'a> TurnSignalContext<'a> {
    fn overlaps_any(&self, message: &AnchorSet) -> bool {
        [self.current_topic, self.target_topic, self.objective]
            .into_iter()
            .flatten()
            .any(|set| set.overlaps(message))
    }
}

/// Classify the user's turn.
///
/// Returns `Clarification` when the clarification heuristic fires,
/// `OffTopicQuestion` when the message reads as a question whose anchors
/// share nothing with the current topic, target topic, or objective AND
/// either matches the off-topic lexicon or the short meta-question
/// heuristic. Everything else, including all turns outside the open
/// phases, is `None`.
pub fn detect_user_turn_signal(
    text: &str,
    language: Language,
    phase: Phase,
    ctx: TurnSignalContext<'_>,
) -> UserTurnSignal {
    if !phase.is_open() {
        return UserTurnSignal::None;
    }

    if is_clarification_signal(text, language) {
        return UserTurnSignal::Clarification;
    }

    if !is_likely_user_question(text, language) {
        return UserTurnSignal::None;
    }

    // A question that shares an anchor root with the interview is a
    // legitimate content question, not an interruption
    let message_anchors = build_message_anchors(text, language);
    if ctx.overlaps_any(&message_anchors) {
        return UserTurnSignal::None;
    }

    let pack = language.pack();
    let lower = text.trim().to_lowercase();

    if pack.off_topic_markers.iter().any(|m| lower.contains(m)) {
        return UserTurnSignal::OffTopicQuestion;
    }

    // Short meta-question aimed at the assistant: few words, second person
    if word_count(&lower) <= META_QUESTION_MAX_WORDS {
        let has_second_person = lower
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| pack.second_person_pronouns.iter().any(|p| *p == word));
        if has_second_person {
            return UserTurnSignal::OffTopicQuestion;
        }
    }

    UserTurnSignal::None
}
