//! Review pass for medical marketing copy
//!
//! Flags marketing superlatives, unsubstantiated claims and efficacy
//! statements without nearby evidence, and produces a softened copy of the
//! text. Nothing is ever blocked: any warning marks the content for human
//! review.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    MarketingSuperlative,
    UnsubstantiatedClaim,
    MissingEvidence,
}

/// One flagged phrase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentWarning {
    pub kind: WarningKind,
    /// Phrase as it appears in the text
    pub phrase: String,
    /// Sentence containing the phrase
    pub excerpt: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewOutcome {
    Clean,
    NeedsHumanReview,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentReview {
    pub warnings: Vec<ContentWarning>,
    /// Input with the fixed softening replacements applied
    pub sanitized: String,
    pub outcome: ReviewOutcome,
}

impl ContentReview {
    pub fn needs_review(&self) -> bool {
        self.outcome == ReviewOutcome::NeedsHumanReview
    }
}

static SUPERLATIVES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:best|revolutionary|miracle|breakthrough|guaranteed|world[- ]class|cutting[- ]edge|unparalleled|unmatched|leading|ultimate|perfect)\b|#1\b|number one",
    )
    .unwrap()
});

static CLAIMS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:cures?|100% effective|no side effects|risk[- ]free|clinically proven|permanent(?:ly)? (?:fix|relief)|instant relief|painless|reverses? aging)\b",
    )
    .unwrap()
});

static EFFICACY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:proven|effective|effectively|reduces?|improves?|prevents?|eliminates?|heals?)\b")
        .unwrap()
});

static EVIDENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:stud(?:y|ies)|trials?|research|according to|evidence|published|doi|meta-analysis|systematic review)\b|\[\d+\]|https?://|\]\(",
    )
    .unwrap()
});

static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+\s+|\n\s*\n").unwrap());

/// Fixed softening replacements applied to the sanitized copy
const SOFTENING: &[(&str, &str)] = &[
    ("miracle cure", "treatment option"),
    ("guaranteed results", "individual results vary"),
    ("100% effective", "effective for many patients"),
    ("no side effects", "few reported side effects"),
];

fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for m in SENTENCE_END.find_iter(text) {
        let sentence = text[start..m.end()].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        start = m.end();
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }

    sentences
}

fn soften(text: &str) -> String {
    let mut result = text.to_string();
    for (phrase, replacement) in SOFTENING {
        let pattern = format!("(?i){}", regex::escape(phrase));
        if let Ok(re) = Regex::new(&pattern) {
            result = re.replace_all(&result, *replacement).into_owned();
        }
    }
    result
}

/// Reviews markdown or plain text
///
/// # Example
///
/// ```
/// use clinic_scout::review::{review_content, ReviewOutcome};
///
/// let review = review_content("Our miracle cure has no side effects!");
/// assert_eq!(review.outcome, ReviewOutcome::NeedsHumanReview);
/// assert_eq!(review.sanitized, "Our treatment option has few reported side effects!");
/// ```
pub fn review_content(text: &str) -> ContentReview {
    let sentences = split_sentences(text);
    let mut warnings = Vec::new();

    for (index, sentence) in sentences.iter().enumerate() {
        for (kind, re) in [
            (WarningKind::MarketingSuperlative, &*SUPERLATIVES),
            (WarningKind::UnsubstantiatedClaim, &*CLAIMS),
        ] {
            for m in re.find_iter(sentence) {
                warnings.push(ContentWarning {
                    kind,
                    phrase: m.as_str().to_string(),
                    excerpt: sentence.to_string(),
                });
            }
        }

        if let Some(m) = EFFICACY.find(sentence) {
            let supported = [index.checked_sub(1), Some(index), Some(index + 1)]
                .into_iter()
                .flatten()
                .filter_map(|i| sentences.get(i))
                .any(|s| EVIDENCE.is_match(s));

            if !supported {
                warnings.push(ContentWarning {
                    kind: WarningKind::MissingEvidence,
                    phrase: m.as_str().to_string(),
                    excerpt: sentence.to_string(),
                });
            }
        }
    }

    for warning in &warnings {
        tracing::warn!(
            kind = ?warning.kind,
            phrase = %warning.phrase,
            "Medical content flagged: {}",
            warning.excerpt
        );
    }

    let outcome = if warnings.is_empty() {
        ReviewOutcome::Clean
    } else {
        ReviewOutcome::NeedsHumanReview
    };

    ContentReview {
        warnings,
        sanitized: soften(text),
        outcome,
    }
}
