//! Normalization and tokenization over raw chat text.
//!
//! Tokens carry byte offsets into the original message so exact surface
//! substrings can be recovered for display after matching.

/// A word token with byte offsets into the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Lowercased token text.
    pub text: String,
    /// Byte offset of the first character in the source.
    pub start: usize,
    /// Byte offset one past the last character in the source.
    pub end: usize,
}

/// Lowercases and trims a message for matching.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

fn is_word_char(c: char) -> bool {
    matches!(c,
        'a'..='z' | 'A'..='Z'
        | 'а'..='я' | 'А'..='Я' | 'ё' | 'Ё'
        // Ukrainian and Kazakh letters outside the base Russian range
        | 'і' | 'І' | 'ї' | 'Ї' | 'є' | 'Є' | 'ґ' | 'Ґ'
        | 'ө' | 'Ө' | 'ү' | 'Ү' | 'ұ' | 'Ұ' | 'қ' | 'Қ'
        | 'ғ' | 'Ғ' | 'ә' | 'Ә' | 'һ' | 'Һ' | 'ң' | 'Ң'
    )
}

/// Splits `text` into maximal runs of Latin/Cyrillic letters.
///
/// Digits and punctuation terminate a token, so `"при1вет"` yields two
/// tokens. Offsets are byte positions into the original `text`.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut token_start = 0usize;

    for (idx, ch) in text.char_indices() {
        if is_word_char(ch) {
            if current.is_empty() {
                token_start = idx;
            }
            current.extend(ch.to_lowercase());
        } else if !current.is_empty() {
            tokens.push(Token {
                text: std::mem::take(&mut current),
                start: token_start,
                end: idx,
            });
        }
    }
    if !current.is_empty() {
        tokens.push(Token {
            text: current,
            start: token_start,
            end: text.len(),
        });
    }
    tokens
}
