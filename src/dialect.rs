//! Jordanian-dialect detection heuristic.
//!
//! Scores input text against a fixed lexicon and a handful of regex
//! patterns. The denominator is the fixed number of checks, not the text
//! length — existing stored `dialect_confidence` values depend on this
//! exact formula, so it is preserved as-is.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Score above which text is labeled Jordanian.
const JORDANIAN_THRESHOLD: f64 = 0.15;

// Lexical markers of Jordanian Arabic (Ammani/Levantine colloquial).
static JORDANIAN_TERMS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "هسا", "هسه", "هلق", "زلمة", "يا زلمة", "شو", "ليش", "وين",
        "كيفك", "منيح", "مش", "هيك", "هاظ", "هاي", "هظول", "بدي",
        "بديش", "معلش", "يلا", "خلص", "طيب", "والله", "عنجد", "اشي",
        "مافي", "فش", "تمام", "مبسوط", "زاكي", "حبيبي", "ولك", "شب",
        "صحتين", "قديش", "وينك", "احكي", "بكفي", "شوي",
    ]
});

// Morphological patterns: بـت present prefix, بد want-construction,
// هسا/هسه temporal marker, يا vocative.
static JORDANIAN_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"\bبت\p{Arabic}{2,}").unwrap(),
        Regex::new(r"\bبد(ي|ك|كو|ها|هم|نا)\b").unwrap(),
        Regex::new(r"\bهس(ا|ه)\b").unwrap(),
        Regex::new(r"\bيا\s+\p{Arabic}+").unwrap(),
    ]
});

/// Dialect label attached to every analysis result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Dialect {
    Jordanian,
    #[serde(rename = "Non-Jordanian")]
    NonJordanian,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Jordanian => "Jordanian",
            Dialect::NonJordanian => "Non-Jordanian",
        }
    }
}

/// Outcome of the dialect heuristic.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DialectScore {
    pub dialect: Dialect,
    /// Matched checks over total checks, in [0, 1], rounded to 4 decimals.
    pub confidence: f64,
}

/// Score `text` against the fixed term list and patterns. Pure and
/// deterministic; identical input always yields an identical score.
pub fn detect_dialect(text: &str) -> DialectScore {
    let lower = text.to_lowercase();

    let term_hits = JORDANIAN_TERMS
        .iter()
        .filter(|term| lower.contains(*term))
        .count();

    let pattern_hits: usize = JORDANIAN_PATTERNS
        .iter()
        .map(|p| p.find_iter(&lower).count())
        .sum();

    let total_checks = JORDANIAN_TERMS.len() + JORDANIAN_PATTERNS.len();
    let score = (term_hits + pattern_hits) as f64;
    let confidence = (score / total_checks.max(1) as f64).min(1.0);

    let dialect = if confidence > JORDANIAN_THRESHOLD {
        Dialect::Jordanian
    } else {
        Dialect::NonJordanian
    };

    DialectScore {
        dialect,
        confidence: crate::inference::round4(confidence),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jordanian_phrase_detected() {
        let score = detect_dialect("هسا شو بتعمل يا زلمة");
        assert_eq!(score.dialect, Dialect::Jordanian);
        assert!(score.confidence > 0.15, "got {}", score.confidence);
    }

    #[test]
    fn english_text_scores_zero() {
        let score = detect_dialect("This is English text");
        assert_eq!(score.dialect, Dialect::NonJordanian);
        assert_eq!(score.confidence, 0.0);
    }

    #[test]
    fn modern_standard_arabic_not_flagged() {
        let score = detect_dialect("أعلنت الحكومة عن خطة اقتصادية جديدة للعام القادم");
        assert_eq!(score.dialect, Dialect::NonJordanian);
    }

    #[test]
    fn just_below_threshold_stays_non_jordanian() {
        // 5 term hits + 1 pattern hit = 6 of 42 checks -> ~0.143
        let score = detect_dialect("هسا شو وين منيح زلمة");
        assert_eq!(score.dialect, Dialect::NonJordanian);
        assert!(score.confidence < 0.15, "got {}", score.confidence);
    }

    #[test]
    fn deterministic_for_identical_input() {
        let a = detect_dialect("يلا منيح كيفك يا حبيبي هسا");
        let b = detect_dialect("يلا منيح كيفك يا حبيبي هسا");
        assert_eq!(a.dialect, b.dialect);
        assert_eq!(a.confidence, b.confidence);
    }

    #[test]
    fn confidence_is_bounded() {
        // Every term concatenated still caps at 1.0
        let all = JORDANIAN_TERMS.join(" ");
        let score = detect_dialect(&all);
        assert!(score.confidence <= 1.0);
        assert_eq!(score.dialect, Dialect::Jordanian);
    }
}
