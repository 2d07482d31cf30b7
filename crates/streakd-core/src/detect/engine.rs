//! The detector proper.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use super::{ChatTriggers, DetectionResult, MatchDetail, MatchKind};
use crate::exclusions::check_exclusions;
use crate::lemma::Lemmatizer;
use crate::patterns::PatternCache;
use crate::text::{normalize, tokenize};

/// Runs lemma and regex detection over messages.
///
/// Cheap to clone; the pattern cache is shared between clones.
#[derive(Clone)]
pub struct Detector {
    patterns: PatternCache,
    lemmatizer: Arc<dyn Lemmatizer>,
}

impl Detector {
    pub fn new(lemmatizer: Arc<dyn Lemmatizer>) -> Self {
        Self {
            patterns: PatternCache::new(),
            lemmatizer,
        }
    }

    /// Uses an externally owned pattern cache, e.g. one cleared on bulk
    /// trigger reloads.
    pub fn with_pattern_cache(lemmatizer: Arc<dyn Lemmatizer>, patterns: PatternCache) -> Self {
        Self { patterns, lemmatizer }
    }

    pub fn pattern_cache(&self) -> &PatternCache {
        &self.patterns
    }

    /// Detects trigger occurrences in `text` against `triggers`.
    ///
    /// Offsets in the returned matches are byte positions into the
    /// original `text`.
    pub fn detect(&self, text: &str, triggers: &ChatTriggers) -> DetectionResult {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return DetectionResult::default();
        }

        if let Some(reason) = check_exclusions(&normalized) {
            debug!(reason, "message excluded from detection");
            return DetectionResult::excluded_by(reason);
        }

        let mut matches = Vec::new();

        // Lemma layer: one match per token whose normalized form is an
        // enabled lemma.
        for token in tokenize(text) {
            let lemma = self.lemmatizer.lemma(&token.text);
            if triggers.lemmas.contains(&lemma) {
                matches.push(MatchDetail {
                    kind: MatchKind::Lemma,
                    start: token.start,
                    end: token.end,
                    text: text[token.start..token.end].to_string(),
                    matched: lemma,
                });
            }
        }

        // The lemma layer wins on exact span collision.
        let lemma_spans: HashSet<(usize, usize)> =
            matches.iter().map(|m| (m.start, m.end)).collect();

        // Regex layer scans a lowercased copy. Lowercasing Latin and
        // Cyrillic keeps byte offsets aligned with the original.
        let lowered = text.to_lowercase();
        for rule in triggers.enabled_rule_names() {
            let Some(re) = self.patterns.compiled(rule) else {
                continue;
            };
            for m in re.find_iter(&lowered) {
                if lemma_spans.contains(&(m.start(), m.end())) {
                    continue;
                }
                matches.push(MatchDetail {
                    kind: MatchKind::Regex,
                    start: m.start(),
                    end: m.end(),
                    text: text
                        .get(m.start()..m.end())
                        .unwrap_or(m.as_str())
                        .to_string(),
                    matched: rule.to_string(),
                });
            }
        }

        matches.sort_by_key(|m| (m.start, m.end));
        DetectionResult::with_matches(matches)
    }
}
