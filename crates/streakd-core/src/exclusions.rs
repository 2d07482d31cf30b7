//! Exclusion rules that short-circuit detection.
//!
//! Quoting a trigger word, linking to it or typing a bot command should
//! never break a streak. The rules run against the normalized message in
//! a fixed order and the first match wins.

use once_cell::sync::Lazy;
use regex::Regex;

/// A single exclusion rule.
pub struct ExclusionRule {
    /// Stable name reported as the exclusion reason.
    pub name: &'static str,
    pattern: Regex,
}

static RULES: Lazy<Vec<ExclusionRule>> = Lazy::new(|| {
    vec![
        ExclusionRule {
            name: "quotation",
            pattern: Regex::new(r#"["'«»“”‘’].{0,100}\b\w+\b.{0,100}["'«»“”‘’]"#)
                .expect("invalid quotation pattern"),
        },
        ExclusionRule {
            name: "url",
            pattern: Regex::new(r"https?://\S+").expect("invalid url pattern"),
        },
        ExclusionRule {
            name: "command",
            pattern: Regex::new(
                r"^/(?:triggers|words|help|counter|leaderboard|reset|undo|addword|removeword|enablerule|disablerule|start)\b",
            )
            .expect("invalid command pattern"),
        },
    ]
});

/// Returns the name of the first matching exclusion rule, if any.
///
/// `text` must already be normalized (lowercased and trimmed).
pub fn check_exclusions(text: &str) -> Option<&'static str> {
    RULES
        .iter()
        .find(|rule| rule.pattern.is_match(text))
        .map(|rule| rule.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_word_is_excluded() {
        assert_eq!(check_exclusions(r#"он сказал "тест" вчера"#), Some("quotation"));
        assert_eq!(check_exclusions("он сказал «тест» вчера"), Some("quotation"));
    }

    #[test]
    fn url_is_excluded() {
        assert_eq!(check_exclusions("смотри https://example.com/тест"), Some("url"));
        assert_eq!(check_exclusions("http://test.ru"), Some("url"));
    }

    #[test]
    fn command_is_excluded() {
        assert_eq!(check_exclusions("/counter"), Some("command"));
        assert_eq!(check_exclusions("/addword тест"), Some("command"));
    }

    #[test]
    fn command_must_start_message() {
        assert_eq!(check_exclusions("напиши /counter"), None);
    }

    #[test]
    fn unknown_command_not_excluded() {
        assert_eq!(check_exclusions("/frobnicate"), None);
    }

    #[test]
    fn plain_text_passes() {
        assert_eq!(check_exclusions("просто тест без кавычек"), None);
    }

    #[test]
    fn quotation_requires_word_between_quotes() {
        // An apostrophe inside a word is not a quotation.
        assert_eq!(check_exclusions("it's fine"), None);
    }
}
