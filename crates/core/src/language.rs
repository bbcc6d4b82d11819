//! Language Packs
//!
//! Per-language pattern tables for the heuristic classifiers. The interview
//! engine branches on language in exactly one place: a language code is
//! resolved to a `Language` at the session boundary, and every classifier
//! then reads its phrase lists from the corresponding `LanguagePack`.
//!
//! The tables encode product judgment calls (filler tokens, clarification
//! phrasing, off-topic small talk, banned generic openers) as data rather
//! than inlined literals so they can be tuned and tested independently of
//! the control flow that consumes them.

use serde::{Deserialize, Serialize};

/// Languages the interview engine supports.
///
/// Unrecognized language codes resolve to English.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Italian,
}

impl Language {
    /// Resolve a BCP-47-ish language code ("it", "it-IT", "en-GB", ...)
    /// to a supported language. The check happens once at the boundary;
    /// nothing downstream looks at the raw code again.
    pub fn from_code(code: &str) -> Self {
        let lower = code.trim().to_lowercase();
        if lower == "it" || lower.starts_with("it-") || lower.starts_with("it_") {
            Self::Italian
        } else {
            Self::English
        }
    }

    /// Get the string form for storage and telemetry tagging
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Italian => "it",
        }
    }

    /// Get the pattern tables for this language
    pub fn pack(&self) -> &'static LanguagePack {
        match self {
            Self::English => &ENGLISH_PACK,
            Self::Italian => &ITALIAN_PACK,
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::English
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pattern tables for one language.
///
/// All entries are lowercase; callers are expected to lowercase input
/// before matching.
pub struct LanguagePack {
    /// Bare filler tokens that signal a non-answer ("ok", "boh", "mah")
    pub filler_tokens: &'static [&'static str],
    /// Substrings that signal an explicit clarification request
    pub clarification_phrases: &'static [&'static str],
    /// Words a question is likely to start with
    pub interrogative_leads: &'static [&'static str],
    /// The either/or conjunction used to detect short A-or-B questions
    pub either_or_conjunction: &'static str,
    /// Substrings that mark small talk or meta-questions about the assistant
    pub off_topic_markers: &'static [&'static str],
    /// Second-person pronouns, used by the short meta-question heuristic
    pub second_person_pronouns: &'static [&'static str],
    /// Generic openers the prompt builder bans ("I see", "Capisco")
    pub generic_openers: &'static [&'static str],
    /// Low-information boilerplate that must never be used as a bridge
    pub bridge_boilerplate: &'static [&'static str],
    /// Stop words excluded from anchor extraction
    pub stop_words: &'static [&'static str],
    /// Generic topic reference when no anchors are available
    pub generic_topic_cue: &'static str,
    /// Tokens that read as an affirmative answer to a yes/no question
    pub affirmation_tokens: &'static [&'static str],
    /// Leading words that negate an otherwise affirmative answer
    pub negation_leads: &'static [&'static str],
    /// Negative/problem language, steering the diagnostic lens to "action"
    pub action_markers: &'static [&'static str],
    /// Urgency/priority language, steering the lens to "priority"
    pub priority_markers: &'static [&'static str],
    /// Outcome/metric language, steering the lens to "impact"
    pub impact_markers: &'static [&'static str],
}

static ENGLISH_PACK: LanguagePack = LanguagePack {
    filler_tokens: &["ok", "okay", "k", "yes", "no", "sure", "fine", "hm", "hmm", "uh", "?"],
    clarification_phrases: &[
        "what do you mean",
        "i don't understand",
        "i dont understand",
        "not sure what",
        "can you clarify",
        "can you explain",
        "could you rephrase",
        "what does that mean",
        "in what sense",
        "sorry?",
        "come again",
    ],
    interrogative_leads: &[
        "what", "why", "how", "when", "where", "who", "which", "can", "could", "would", "should",
        "do", "does", "did", "is", "are", "will",
    ],
    either_or_conjunction: " or ",
    off_topic_markers: &[
        "the weather",
        "are you a bot",
        "are you human",
        "are you real",
        "who made you",
        "who created you",
        "what model are you",
        "chatgpt",
        "how are you today",
        "tell me a joke",
        "what time is it",
        "what day is it",
    ],
    second_person_pronouns: &["you", "your", "yours", "yourself"],
    generic_openers: &[
        "i see",
        "i understand",
        "got it",
        "understood",
        "thanks for sharing",
        "thank you for sharing",
        "that's interesting",
        "interesting",
        "great,",
        "great!",
        "perfect,",
        "perfect!",
    ],
    bridge_boilerplate: &[
        "i already told you",
        "i already said",
        "as i said",
        "like i said",
        "see above",
        "ok",
        "yes",
        "no",
        "sure",
        "nothing",
        "idk",
        "i don't know",
    ],
    stop_words: &[
        "a", "an", "the", "and", "or", "but", "of", "to", "in", "on", "at", "for", "with",
        "about", "from", "into", "over", "after", "before", "is", "are", "was", "were", "be",
        "been", "being", "it", "its", "this", "that", "these", "those", "i", "you", "he", "she",
        "we", "they", "my", "your", "our", "their", "me", "him", "her", "us", "them", "what",
        "which", "who", "how", "why", "when", "where", "do", "does", "did", "have", "has", "had",
        "not", "no", "yes", "so", "as", "if", "then", "than", "too", "very", "can", "will",
        "just", "also", "more", "most", "some", "any", "would", "could", "should",
    ],
    generic_topic_cue: "this topic",
    affirmation_tokens: &[
        "yes", "yeah", "yep", "sure", "ok", "okay", "of course", "definitely", "certainly",
        "absolutely", "go ahead", "fine by me", "sounds good",
    ],
    negation_leads: &["no", "not", "nope", "never", "don't", "dont"],
    action_markers: &[
        "problem", "issue", "difficult", "hard", "struggle", "struggling", "fail", "failing",
        "wrong", "broken", "frustrat", "worried", "worry", "blocker", "stuck",
    ],
    priority_markers: &[
        "urgent", "asap", "priority", "priorities", "deadline", "immediately", "critical",
        "first thing", "right away",
    ],
    impact_markers: &[
        "result", "revenue", "growth", "increase", "decrease", "conversion", "percent", "%",
        "metric", "kpi", "sales", "churn", "retention rate", "margin",
    ],
};

static ITALIAN_PACK: LanguagePack = LanguagePack {
    filler_tokens: &["ok", "okay", "va bene", "boh", "mah", "si", "sì", "no", "certo", "eh", "?"],
    clarification_phrases: &[
        "cosa intendi",
        "che intendi",
        "non ho capito",
        "non capisco",
        "in che senso",
        "puoi spiegare",
        "puoi chiarire",
        "puoi ripetere",
        "cioè?",
        "cioe?",
        "cosa vuol dire",
        "cosa significa",
        "scusa?",
    ],
    interrogative_leads: &[
        "cosa", "che", "come", "perché", "perche", "quando", "dove", "chi", "quale", "quali",
        "quanto", "quanti", "quante", "posso", "puoi", "potrebbe", "è", "sono", "hai", "ha",
    ],
    either_or_conjunction: " o ",
    off_topic_markers: &[
        "che tempo fa",
        "sei un bot",
        "sei un robot",
        "sei umano",
        "sei una persona",
        "chi ti ha creato",
        "chi ti ha fatto",
        "che modello sei",
        "chatgpt",
        "come stai",
        "raccontami una barzelletta",
        "che ore sono",
        "che giorno è",
    ],
    second_person_pronouns: &["tu", "te", "ti", "tuo", "tua", "tuoi", "tue", "lei", "voi"],
    generic_openers: &[
        "capisco",
        "ho capito",
        "comprendo",
        "chiaro",
        "perfetto,",
        "perfetto!",
        "ottimo,",
        "ottimo!",
        "interessante",
        "grazie per aver condiviso",
        "grazie della condivisione",
        "bene,",
    ],
    bridge_boilerplate: &[
        "te l'ho già detto",
        "te l'ho gia detto",
        "l'ho già detto",
        "come ho detto",
        "come già detto",
        "ok",
        "va bene",
        "si",
        "sì",
        "no",
        "certo",
        "niente",
        "non so",
        "non lo so",
        "boh",
    ],
    stop_words: &[
        "il", "lo", "la", "i", "gli", "le", "un", "uno", "una", "di", "a", "da", "in", "con",
        "su", "per", "tra", "fra", "e", "o", "ma", "che", "chi", "cui", "non", "più", "piu",
        "come", "dove", "quando", "perché", "perche", "cosa", "quale", "quali", "questo",
        "questa", "questi", "queste", "quello", "quella", "io", "tu", "lui", "lei", "noi",
        "voi", "loro", "mi", "ti", "ci", "vi", "si", "mio", "tuo", "suo", "nostro", "vostro",
        "è", "sono", "sei", "siamo", "siete", "era", "ho", "hai", "ha", "abbiamo", "hanno",
        "del", "della", "dei", "delle", "dello", "al", "alla", "ai", "alle", "nel", "nella",
        "sul", "sulla", "se", "anche", "molto", "poi", "già", "gia",
    ],
    generic_topic_cue: "questo tema",
    affirmation_tokens: &[
        "sì", "si", "certo", "va bene", "ok", "okay", "d'accordo", "daccordo", "assolutamente",
        "volentieri", "procedi", "per me va bene",
    ],
    negation_leads: &["no", "non", "mai", "niente"],
    action_markers: &[
        "problema", "problemi", "difficile", "difficoltà", "difficolta", "fatica", "sbagliato",
        "rotto", "non funziona", "preoccup", "rischio", "bloccato", "fermo",
    ],
    priority_markers: &[
        "urgente", "subito", "priorità", "priorita", "scadenza", "immediatamente", "critico",
        "prima di tutto",
    ],
    impact_markers: &[
        "risultato", "risultati", "fatturato", "crescita", "aumento", "calo", "percentuale",
        "%", "conversione", "vendite", "metrica", "margine",
    ],
};
