//! Lexical primitives shared by the quote guard: normalization, token and
//! trigram sets, Jaccard similarity and the content hash.

use std::collections::BTreeSet;

/// Words dropped before token comparison.
pub const STOPWORDS: &[&str] = &[
    "a", "the", "and", "is", "of", "to", "in", "for", "with", "on", "that", "it", "as", "at",
];

/// Quote marks and dashes that separate words rather than join them.
const SEPARATORS: &[char] = &['\u{201C}', '\u{201D}', '"', '\'', '\u{2013}', '\u{2014}', '-'];

const TRIGRAM_LEN: usize = 3;

/// Normalizes text for comparison.
///
/// Lowercases, turns quotes/dashes and anything outside `[a-z0-9\s]` into
/// spaces, then collapses whitespace. `normalize(normalize(s)) == normalize(s)`.
pub fn normalize(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let replaced: String = lowered
        .chars()
        .map(|c| {
            if SEPARATORS.contains(&c) {
                ' '
            } else if c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Stopword-filtered word set of an already-normalized string.
pub fn token_set(normalized: &str) -> BTreeSet<String> {
    normalized
        .split_whitespace()
        .filter(|t| !STOPWORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// All 3-character windows of an already-normalized string.
///
/// Normalized text is ASCII, so byte windows are char windows.
pub fn trigram_set(normalized: &str) -> BTreeSet<String> {
    let bytes = normalized.as_bytes();
    if bytes.len() < TRIGRAM_LEN {
        return BTreeSet::new();
    }
    bytes
        .windows(TRIGRAM_LEN)
        .map(|w| String::from_utf8_lossy(w).into_owned())
        .collect()
}

/// Jaccard index `|A ∩ B| / |A ∪ B|`.
///
/// Two empty sets are identical (1.0); an empty set against a non-empty one
/// shares nothing (0.0).
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Deterministic hash of a normalized form, prefixed with its scheme.
pub fn content_hash(norm: &str) -> String {
    format!("blake3:{}", blake3::hash(norm.as_bytes()).to_hex())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_strips_punctuation_and_case() {
        assert_eq!(normalize("  Be WATER, my friend!  "), "be water my friend");
    }

    #[test]
    fn test_normalize_splits_on_quotes_and_dashes() {
        assert_eq!(
            normalize("\u{201C}Now\u{201D}\u{2014}is all\u{2013}there-is"),
            "now is all there is"
        );
        assert_eq!(normalize("don't"), "don t");
    }

    #[test]
    fn test_normalize_drops_non_ascii() {
        assert_eq!(normalize("李小龍"), "");
        assert_eq!(normalize("Café  au lait"), "caf au lait");
    }

    #[test]
    fn test_tokens_exclude_stopwords() {
        let tokens = token_set(&normalize("The mind is a mirror of the moon"));
        assert_eq!(tokens, set(&["mind", "mirror", "moon"]));
    }

    #[test]
    fn test_trigrams_short_text_is_empty() {
        assert!(trigram_set("ab").is_empty());
        assert_eq!(trigram_set("abc"), set(&["abc"]));
        assert_eq!(trigram_set("a bc"), set(&["a b", " bc"]));
    }

    #[test]
    fn test_jaccard_empty_convention() {
        assert_eq!(jaccard(&BTreeSet::new(), &BTreeSet::new()), 1.0);
        assert_eq!(jaccard(&BTreeSet::new(), &set(&["a"])), 0.0);
        assert_eq!(jaccard(&set(&["a"]), &BTreeSet::new()), 0.0);
    }

    #[test]
    fn test_jaccard_partial_overlap() {
        let score = jaccard(&set(&["a", "b", "c"]), &set(&["b", "c", "d"]));
        assert!((score - 0.5).abs() < f64::EPSILON, "Score was {score}");
    }

    #[test]
    fn test_content_hash_is_stable() {
        let h = content_hash("be water | bruce lee");
        assert!(h.starts_with("blake3:"));
        assert_eq!(h, content_hash("be water | bruce lee"));
        assert_ne!(h, content_hash("be water | lao tzu"));
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(s in "\\PC{0,64}") {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once);
        }
    }
}
