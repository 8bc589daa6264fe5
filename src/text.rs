//! Text validation and lightweight Arabic text helpers.
//!
//! Everything here is pure string matching. The heavy lifting (sentiment,
//! summarization) is delegated to the remote inference endpoints.

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

/// Upper bound on accepted input, in characters. Enforced before any
/// network call is made.
pub const MAX_TEXT_CHARS: usize = 10_000;

/// Trim and bounds-check submitted text. Returns the trimmed slice.
pub fn validate_input(text: &str) -> Result<&str, &'static str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("text is empty");
    }
    if trimmed.chars().count() > MAX_TEXT_CHARS {
        return Err("text exceeds maximum length");
    }
    Ok(trimmed)
}

/// Normalize Arabic text for keyword matching: strip tatweel and harakat,
/// unify alef variants, map final ya variants. The stored content keeps the
/// original form; this is only used for matching.
pub fn normalize_arabic(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            '\u{0640}' => None,                     // tatweel
            '\u{064B}'..='\u{065F}' | '\u{0670}' => None, // harakat
            'أ' | 'إ' | 'آ' => Some('ا'),
            'ى' => Some('ي'),
            _ => Some(c),
        })
        .collect()
}

// High-frequency Arabic function words excluded from keyword extraction
static ARABIC_STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    vec![
        "في", "من", "علي", "الي", "عن", "مع", "هذا", "هذه", "ذلك", "تلك",
        "التي", "الذي", "الذين", "ان", "كان", "كانت", "قد", "لقد", "لا",
        "ما", "لم", "لن", "هو", "هي", "هم", "هن", "نحن", "انا", "انت",
        "كل", "بعض", "غير", "بين", "بعد", "قبل", "عند", "عندما", "حتي",
        "اذا", "لكن", "ثم", "كما", "منذ", "حيث", "حول", "دون", "ضد",
        "خلال", "امام", "تحت", "فوق", "ايضا", "فقط", "كانوا", "يكون",
        "وهو", "وهي", "الى", "إلى", "أو", "او",
    ]
    .into_iter()
    .collect()
});

/// Extract the most frequent non-stopword tokens, most frequent first.
/// Ties break alphabetically so output is deterministic.
pub fn extract_keywords(text: &str, limit: usize) -> Vec<String> {
    let normalized = normalize_arabic(&text.to_lowercase());

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for token in normalized
        .split(|c: char| !c.is_alphabetic())
        .filter(|t| t.chars().count() > 2)
        .filter(|t| !ARABIC_STOPWORDS.contains(t))
    {
        *counts.entry(token).or_insert(0) += 1;
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(limit)
        .map(|(t, _)| t.to_string())
        .collect()
}

// Category keyword lists. First category with a hit wins; lists are checked
// in a fixed order so categorization is deterministic.
static CATEGORY_TERMS: Lazy<Vec<(&'static str, Vec<&'static str>)>> = Lazy::new(|| {
    vec![
        (
            "politics",
            vec![
                "حكومة", "وزير", "وزارة", "برلمان", "انتخابات", "رئيس",
                "سياسة", "قانون", "مجلس النواب", "معارضة", "دبلوماسي",
            ],
        ),
        (
            "economy",
            vec![
                "اقتصاد", "اسعار", "أسعار", "دينار", "تضخم", "بورصة",
                "استثمار", "ضريبة", "بنك", "سوق", "بطالة",
            ],
        ),
        (
            "sports",
            vec![
                "كرة", "مباراة", "منتخب", "دوري", "لاعب", "هدف", "بطولة",
                "ملعب", "فريق",
            ],
        ),
        (
            "technology",
            vec![
                "تقنية", "تكنولوجيا", "هاتف", "تطبيق", "انترنت", "إنترنت",
                "ذكاء اصطناعي", "برمجة", "شبكة",
            ],
        ),
        (
            "society",
            vec![
                "مجتمع", "تعليم", "صحة", "جامعة", "مدرسة", "مستشفى",
                "اسرة", "أسرة", "شباب",
            ],
        ),
    ]
});

/// Keyword-match categorization. Returns the category with the most term
/// hits, or None when nothing matches.
pub fn categorize(text: &str) -> Option<&'static str> {
    let normalized = normalize_arabic(&text.to_lowercase());

    let mut best: Option<(&'static str, usize)> = None;
    for (category, terms) in CATEGORY_TERMS.iter() {
        let hits = terms.iter().filter(|t| normalized.contains(*t)).count();
        if hits > 0 && best.map_or(true, |(_, b)| hits > b) {
            best = Some((category, hits));
        }
    }
    best.map(|(c, _)| c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_rejected() {
        assert!(validate_input("").is_err());
        assert!(validate_input("   \n\t ").is_err());
    }

    #[test]
    fn oversized_input_rejected() {
        let big = "ا".repeat(MAX_TEXT_CHARS + 1);
        assert!(validate_input(&big).is_err());
    }

    #[test]
    fn valid_input_is_trimmed() {
        assert_eq!(validate_input("  مرحبا  ").unwrap(), "مرحبا");
    }

    #[test]
    fn normalization_unifies_alef_and_strips_harakat() {
        assert_eq!(normalize_arabic("أَهْلاً"), "اهلا");
        assert_eq!(normalize_arabic("إنترنت"), "انترنت");
        assert_eq!(normalize_arabic("مستشفــــى"), "مستشفي");
    }

    #[test]
    fn keywords_skip_stopwords() {
        let text = "الاقتصاد في الاردن الاقتصاد ينمو من جديد";
        let keywords = extract_keywords(text, 3);
        assert_eq!(keywords[0], "الاقتصاد");
        assert!(!keywords.contains(&"في".to_string()));
        assert!(!keywords.contains(&"من".to_string()));
    }

    #[test]
    fn categorize_matches_fixed_lists() {
        assert_eq!(categorize("فازت كرة القدم في المباراة"), Some("sports"));
        assert_eq!(categorize("ارتفعت أسعار الدينار في السوق"), Some("economy"));
        assert_eq!(categorize("just plain english"), None);
    }

    #[test]
    fn category_with_more_hits_wins() {
        // one politics term, two economy terms
        let text = "الحكومة ترفع اسعار الضريبة في السوق";
        assert_eq!(categorize(text), Some("economy"));
    }
}
