//! Topic Anchor Extractor
//!
//! Derives salient keyword "anchors" from free text: topic labels, user
//! messages, and the interview objective. Anchors exist in two forms: a
//! display form (for building natural topic references) and a normalized
//! root form used for semantic-overlap comparison. Both topic labels and
//! messages go through the same pipeline so their roots can be
//! intersected.
//!
//! Pure and total: any input, including empty or whitespace-only text,
//! yields a (possibly empty) anchor set without errors.

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use interview_core::Language;

/// Maximum anchors kept per text; the most salient (longest) roots win
const MAX_ANCHORS: usize = 8;

/// Minimum root length for a token to qualify as an anchor
const MIN_ROOT_LEN: usize = 3;

/// Keyword anchors extracted from one text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AnchorSet {
    /// Display forms, original casing, salience order
    pub anchors: Vec<String>,
    /// Normalized comparison forms, parallel to `anchors`
    pub anchor_roots: Vec<String>,
}

impl AnchorSet {
    pub fn is_empty(&self) -> bool {
        self.anchor_roots.is_empty()
    }

    /// Whether any root is shared with another set
    pub fn overlaps(&self, other: &AnchorSet) -> bool {
        self.anchor_roots
            .iter()
            .any(|root| other.anchor_roots.iter().any(|o| o == root))
    }

    /// The longest display anchor, i.e. the most specific one
    pub fn most_specific(&self) -> Option<&str> {
        self.anchors
            .iter()
            .max_by_key(|a| a.chars().count())
            .map(|s| s.as_str())
    }
}

/// Build anchors from a topic label or description
pub fn build_topic_anchors(text: &str, language: Language) -> AnchorSet {
    build_anchors(text, language)
}

/// Build anchors from an arbitrary conversation message
pub fn build_message_anchors(text: &str, language: Language) -> AnchorSet {
    build_anchors(text, language)
}

fn build_anchors(text: &str, language: Language) -> AnchorSet {
    let pack = language.pack();
    let mut anchors: Vec<String> = Vec::new();
    let mut roots: Vec<String> = Vec::new();

    // Apostrophes split too, so Italian elisions ("dell'azienda") and
    // English contractions ("what's") contribute their content word only
    for display in text.split(|c: char| !c.is_alphanumeric()) {
        if display.is_empty() {
            continue;
        }

        let folded = fold(display);
        if folded.chars().count() < MIN_ROOT_LEN {
            continue;
        }
        if pack.stop_words.iter().any(|w| fold(w) == folded) {
            continue;
        }

        let root = reduce_to_root(&folded, language);
        if root.chars().count() < MIN_ROOT_LEN {
            continue;
        }
        if roots.iter().any(|r| r == &root) {
            continue;
        }

        anchors.push(display.to_string());
        roots.push(root);
    }

    // Keep the most specific anchors when the text is long
    if roots.len() > MAX_ANCHORS {
        let mut order: Vec<usize> = (0..roots.len()).collect();
        order.sort_by_key(|&i| std::cmp::Reverse(roots[i].chars().count()));
        order.truncate(MAX_ANCHORS);
        order.sort_unstable();
        anchors = order.iter().map(|&i| anchors[i].clone()).collect();
        roots = order.iter().map(|&i| roots[i].clone()).collect();
    }

    AnchorSet {
        anchors,
        anchor_roots: roots,
    }
}

/// Lowercase and strip diacritics via NFD decomposition, so "qualità"
/// and "qualita" share a root
fn fold(token: &str) -> String {
    token
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

fn is_combining_mark(c: char) -> bool {
    // Combining Diacritical Marks block covers everything Italian and
    // Western European input produces under NFD
    ('\u{0300}'..='\u{036F}').contains(&c)
}

/// Reduce a folded token to a comparable root so morphological variants
/// match: Italian plural/singular vowel endings, English plural and
/// simple verb suffixes.
fn reduce_to_root(folded: &str, language: Language) -> String {
    let chars = folded.chars().count();
    match language {
        Language::Italian => {
            // "prodotti"/"prodotto", "aziende"/"azienda": the final vowel
            // carries number/gender, not meaning
            if chars > 4 && folded.ends_with(['a', 'e', 'i', 'o']) {
                folded[..folded.len() - 1].to_string()
            } else {
                folded.to_string()
            }
        }
        Language::English => {
            if chars > 5 && folded.ends_with("ing") {
                folded[..folded.len() - 3].to_string()
            } else if chars > 4 && folded.ends_with("ed") {
                folded[..folded.len() - 2].to_string()
            } else if chars > 3 && folded.ends_with('s') && !folded.ends_with("ss") {
                folded[..folded.len() - 1].to_string()
            } else {
                folded.to_string()
            }
        }
    }
}
