use serde::{Deserialize, Serialize};

use crate::models::post::DailyPost;

const QUOTE_MAX_WORDS: usize = 24;
const JOURNAL_PROMPT_MAX_CHARS: usize = 120;
const HASHTAGS_MIN: usize = 10;
const HASHTAGS_MAX: usize = 15;
const REQUIRED_HASHTAG: &str = "#BreathOfNow";
const MEDITATION_MAX_CHARS: usize = 500;
const CAPTION_MAX_CHARS: usize = 600;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub passed: bool,
    pub errors: Vec<String>,
}

/// Checks a structurally valid post against the content rules.
///
/// Collects every failure rather than stopping at the first, so a retry
/// prompt or log line can show all of them.
pub fn validate_post(post: &DailyPost, tradition: &str, visual_keywords: &[String]) -> ValidationReport {
    let mut errors = Vec::new();

    if word_count(&post.quote_text) > QUOTE_MAX_WORDS {
        errors.push(format!("quote_text exceeds {QUOTE_MAX_WORDS} words"));
    }

    for (key, prompt) in [("jp1", &post.jp1), ("jp2", &post.jp2)] {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            errors.push(format!("{key} empty"));
            continue;
        }
        if !is_first_person(prompt) {
            errors.push(format!("{key} must start with 'I ' + verb (first-person)"));
        }
        if prompt.chars().count() > JOURNAL_PROMPT_MAX_CHARS {
            errors.push(format!("{key} exceeds {JOURNAL_PROMPT_MAX_CHARS} chars"));
        }
    }

    let tags = &post.carousel_hashtags;
    if !(HASHTAGS_MIN..=HASHTAGS_MAX).contains(&tags.len()) {
        errors.push(format!(
            "carousel_hashtags must have {HASHTAGS_MIN}–{HASHTAGS_MAX} items"
        ));
    }
    let unique: std::collections::HashSet<&String> = tags.iter().collect();
    if unique.len() != tags.len() {
        errors.push("carousel_hashtags contains duplicates".to_string());
    }
    if !tags.iter().any(|t| t == REQUIRED_HASHTAG) {
        errors.push(format!("carousel_hashtags must include {REQUIRED_HASHTAG}"));
    }

    let image_prompt = post.image_prompt.to_lowercase();
    if !visual_keywords
        .iter()
        .any(|k| image_prompt.contains(&k.to_lowercase()))
    {
        errors.push(format!("image_prompt missing a {tradition} visual keyword"));
    }

    for (key, text) in [("med1", &post.med1), ("med2", &post.med2)] {
        if text.chars().count() > MEDITATION_MAX_CHARS {
            errors.push(format!("{key} exceeds {MEDITATION_MAX_CHARS} chars"));
        }
    }

    if !post.poem_text.is_empty() && !post.poem_text.contains("\n\n") {
        errors.push("poem_text should have blank line between stanzas (2–3 stanzas)".to_string());
    }

    for (key, text) in [
        ("carousel_caption", &post.carousel_caption),
        ("poem_caption", &post.poem_caption),
        ("image_caption", &post.image_caption),
    ] {
        if text.chars().count() > CAPTION_MAX_CHARS {
            errors.push(format!("{key} exceeds {CAPTION_MAX_CHARS} chars"));
        }
    }

    ValidationReport {
        passed: errors.is_empty(),
        errors,
    }
}

/// Counts runs of word characters (letters, digits, underscore).
fn word_count(text: &str) -> usize {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .count()
}

/// "I" followed by whitespace and then a lowercase letter.
fn is_first_person(prompt: &str) -> bool {
    let Some(rest) = prompt.strip_prefix('I') else {
        return false;
    };
    let after_space = rest.trim_start();
    if after_space.len() == rest.len() {
        return false;
    }
    after_space
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::post::fixtures::valid_post;

    fn zen_keywords() -> Vec<String> {
        vec!["ensō".to_string(), "Raked Sand".to_string()]
    }

    #[test]
    fn test_valid_post_passes() {
        let report = validate_post(&valid_post("Be water.", "Bruce Lee"), "Zen", &zen_keywords());
        assert!(report.passed, "errors: {:?}", report.errors);
    }

    #[test]
    fn test_long_quote_fails() {
        let quote = vec!["word"; 25].join(" ");
        let report = validate_post(&valid_post(&quote, "Anon"), "Zen", &zen_keywords());
        assert_eq!(report.errors, vec!["quote_text exceeds 24 words".to_string()]);
    }

    #[test]
    fn test_journal_prompt_rules() {
        let mut post = valid_post("Be water.", "Bruce Lee");
        post.jp1 = "Notice your breath.".to_string();
        post.jp2 = "   ".to_string();
        let report = validate_post(&post, "Zen", &zen_keywords());
        assert!(!report.passed);
        assert!(report.errors.contains(&"jp1 must start with 'I ' + verb (first-person)".to_string()));
        assert!(report.errors.contains(&"jp2 empty".to_string()));

        post.jp1 = format!("I {}", "a".repeat(120));
        post.jp2 = "I notice.".to_string();
        let report = validate_post(&post, "Zen", &zen_keywords());
        assert_eq!(report.errors, vec!["jp1 exceeds 120 chars".to_string()]);
    }

    #[test]
    fn test_hashtag_rules() {
        let mut post = valid_post("Be water.", "Bruce Lee");
        post.carousel_hashtags = vec!["#calm".to_string(); 3];
        let report = validate_post(&post, "Zen", &zen_keywords());
        assert_eq!(report.errors.len(), 3, "errors: {:?}", report.errors);
    }

    #[test]
    fn test_visual_keyword_is_case_insensitive() {
        let mut post = valid_post("Be water.", "Bruce Lee");
        post.image_prompt = "A RAKED SAND garden".to_string();
        assert!(validate_post(&post, "Zen", &zen_keywords()).passed);

        post.image_prompt = "A city skyline".to_string();
        let report = validate_post(&post, "Zen", &zen_keywords());
        assert_eq!(report.errors, vec!["image_prompt missing a Zen visual keyword".to_string()]);
    }

    #[test]
    fn test_length_and_stanza_rules() {
        let mut post = valid_post("Be water.", "Bruce Lee");
        post.med2 = "m".repeat(501);
        post.poem_text = "one stanza only".to_string();
        post.image_caption = "c".repeat(601);
        let report = validate_post(&post, "Zen", &zen_keywords());
        assert_eq!(report.errors.len(), 3, "errors: {:?}", report.errors);
    }

    #[test]
    fn test_word_count_and_first_person_helpers() {
        assert_eq!(word_count("Be water, my friend."), 4);
        assert_eq!(word_count("  "), 0);
        assert!(is_first_person("I choose stillness"));
        assert!(is_first_person("I  breathe"));
        assert!(!is_first_person("I'm calm"));
        assert!(!is_first_person("I Notice"));
        assert!(!is_first_person("In stillness"));
    }
}
