//! Cross-script transliteration between Cyrillic and Latin spellings.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use super::tables::{LAT_TO_RU, RU_TO_LAT};

static RU_UNITS: Lazy<HashMap<&'static str, &'static [&'static str]>> =
    Lazy::new(|| RU_TO_LAT.iter().copied().collect());
static LAT_UNITS: Lazy<HashMap<&'static str, &'static [&'static str]>> =
    Lazy::new(|| LAT_TO_RU.iter().copied().collect());

/// Longest unit length in the lookup tables, in characters.
const MAX_UNIT_CHARS: usize = 4;

/// A transliterated rendering of a word in the opposite script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transliteration {
    /// Regex fragment matching every candidate spelling.
    pub pattern: String,
    /// Canonical example spelling, first candidate at every position.
    pub example: String,
}

fn is_cyrillic(word: &str) -> bool {
    word.chars()
        .any(|c| ('\u{0400}'..='\u{04FF}').contains(&c))
}

enum Piece {
    /// A unit found in the table, with its candidate target spellings.
    Mapped(&'static [&'static str]),
    /// A character the table does not know (digits, punctuation).
    Literal(char),
}

/// Greedy longest-match segmentation of `word` into transliteration
/// units, trying 4-, 3- and 2-character substrings before single
/// characters.
fn segment(word: &str, units: &HashMap<&'static str, &'static [&'static str]>) -> Vec<Piece> {
    let chars: Vec<char> = word.chars().collect();
    let mut pieces = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let longest = MAX_UNIT_CHARS.min(chars.len() - i);
        let mut consumed = 0;
        for len in (2..=longest).rev() {
            let unit: String = chars[i..i + len].iter().collect();
            if let Some(candidates) = units.get(unit.as_str()) {
                pieces.push(Piece::Mapped(candidates));
                consumed = len;
                break;
            }
        }
        if consumed == 0 {
            let single = chars[i].to_string();
            match units.get(single.as_str()) {
                Some(candidates) => pieces.push(Piece::Mapped(candidates)),
                None => pieces.push(Piece::Literal(chars[i])),
            }
            consumed = 1;
        }
        i += consumed;
    }
    pieces
}

/// Transliterates `word` into the opposite script.
///
/// The script is picked by presence of any Cyrillic character. Returns
/// `None` when the result is indistinguishable from the input, in which
/// case no transliteration variants should be generated.
pub fn transliterate(word: &str) -> Option<Transliteration> {
    let units = if is_cyrillic(word) {
        &*RU_UNITS
    } else {
        &*LAT_UNITS
    };

    let mut pattern = String::new();
    let mut example = String::new();

    for piece in segment(word, units) {
        match piece {
            Piece::Literal(c) => {
                pattern.push_str(&regex::escape(&c.to_string()));
                example.push(c);
            }
            Piece::Mapped(candidates) => {
                let candidates: Vec<&str> =
                    candidates.iter().copied().filter(|c| !c.is_empty()).collect();
                match candidates.as_slice() {
                    // Silent letter, contributes nothing.
                    [] => {}
                    [only] => {
                        pattern.push_str(&regex::escape(only));
                        example.push_str(only);
                    }
                    many => {
                        let alts: Vec<String> =
                            many.iter().map(|c| regex::escape(c)).collect();
                        pattern.push_str("(?:");
                        pattern.push_str(&alts.join("|"));
                        pattern.push(')');
                        example.push_str(many[0]);
                    }
                }
            }
        }
    }

    if example.is_empty() || example == word {
        return None;
    }
    Some(Transliteration { pattern, example })
}
