//! Match and trigger-set types shared across the engine.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Which detection layer produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Token matched an enabled lemma after normalization.
    Lemma,
    /// An evasion rule's regex matched.
    Regex,
}

/// A single match with byte offsets into the original message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchDetail {
    pub kind: MatchKind,
    pub start: usize,
    pub end: usize,
    /// Surface text exactly as it appeared in the message.
    pub text: String,
    /// The normalized lemma for lemma matches, the rule name for regex
    /// matches.
    pub matched: String,
}

/// Outcome of running detection over one message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// True iff at least one match survived merging.
    pub triggered: bool,
    /// Merged matches, ascending by start offset.
    pub matches: Vec<MatchDetail>,
    /// True when an exclusion rule short-circuited detection.
    pub excluded: bool,
    /// Name of the exclusion rule that fired.
    pub exclusion_reason: Option<String>,
}

impl DetectionResult {
    /// A non-triggered result cut short by an exclusion rule.
    pub fn excluded_by(reason: &str) -> Self {
        Self {
            excluded: true,
            exclusion_reason: Some(reason.to_string()),
            ..Self::default()
        }
    }

    /// A result carrying `matches`; triggered iff non-empty.
    pub fn with_matches(matches: Vec<MatchDetail>) -> Self {
        Self {
            triggered: !matches.is_empty(),
            matches,
            ..Self::default()
        }
    }
}

/// Per-chat trigger configuration consumed by the detector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatTriggers {
    /// Enabled lemma strings.
    pub lemmas: HashSet<String>,
    /// Evasion rule name → enabled flag.
    pub rules: HashMap<String, bool>,
}

impl ChatTriggers {
    /// Enabled rule names in a stable order.
    pub fn enabled_rule_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .rules
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.lemmas.is_empty() && self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excluded_result_is_not_triggered() {
        let result = DetectionResult::excluded_by("quotation");
        assert!(!result.triggered);
        assert!(result.excluded);
        assert_eq!(result.exclusion_reason.as_deref(), Some("quotation"));
    }

    #[test]
    fn with_matches_sets_triggered() {
        assert!(!DetectionResult::with_matches(vec![]).triggered);
        let m = MatchDetail {
            kind: MatchKind::Lemma,
            start: 0,
            end: 4,
            text: "тест".into(),
            matched: "тест".into(),
        };
        assert!(DetectionResult::with_matches(vec![m]).triggered);
    }

    #[test]
    fn enabled_rule_names_sorted_and_filtered() {
        let mut triggers = ChatTriggers::default();
        triggers.rules.insert("b_spaced".into(), true);
        triggers.rules.insert("a_spaced".into(), true);
        triggers.rules.insert("c_spaced".into(), false);
        assert_eq!(triggers.enabled_rule_names(), vec!["a_spaced", "b_spaced"]);
    }

    #[test]
    fn match_kind_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&MatchKind::Lemma).unwrap(), "\"lemma\"");
        assert_eq!(serde_json::to_string(&MatchKind::Regex).unwrap(), "\"regex\"");
    }
}
