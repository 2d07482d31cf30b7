//! Lemmatizer seam for the lemma detection layer.
//!
//! Detection only needs `word → normalized form`; the actual morphology
//! backend is pluggable. A failure to normalize degrades to the raw word
//! mapping to itself.

use std::collections::HashMap;

/// Reduces an inflected word form to its dictionary lemma.
pub trait Lemmatizer: Send + Sync {
    /// Returns the lemma for `word`. Input is already lowercased.
    fn lemma(&self, word: &str) -> String;
}

/// Passes every word through unchanged.
///
/// Used when no morphology data is available; detection then relies on
/// exact forms plus the generated regex variants.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityLemmatizer;

impl Lemmatizer for IdentityLemmatizer {
    fn lemma(&self, word: &str) -> String {
        word.to_string()
    }
}

/// Table-driven lemmatizer mapping inflected forms to lemmas.
///
/// Unknown forms map to themselves.
#[derive(Debug, Clone, Default)]
pub struct TableLemmatizer {
    forms: HashMap<String, String>,
}

impl TableLemmatizer {
    /// Builds a lemmatizer from `(form, lemma)` pairs. Both sides are
    /// lowercased on load.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let forms = pairs
            .into_iter()
            .map(|(form, lemma)| {
                let form: String = form.into();
                let lemma: String = lemma.into();
                (form.to_lowercase(), lemma.to_lowercase())
            })
            .collect();
        Self { forms }
    }

    /// Number of known forms.
    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }
}

impl Lemmatizer for TableLemmatizer {
    fn lemma(&self, word: &str) -> String {
        self.forms
            .get(word)
            .cloned()
            .unwrap_or_else(|| word.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_returns_input() {
        assert_eq!(IdentityLemmatizer.lemma("тесты"), "тесты");
    }

    #[test]
    fn table_maps_known_forms() {
        let lem = TableLemmatizer::from_pairs([("тесты", "тест"), ("Тестом", "тест")]);
        assert_eq!(lem.lemma("тесты"), "тест");
        assert_eq!(lem.lemma("тестом"), "тест");
    }

    #[test]
    fn table_unknown_word_maps_to_itself() {
        let lem = TableLemmatizer::from_pairs([("тесты", "тест")]);
        assert_eq!(lem.lemma("привет"), "привет");
    }
}
