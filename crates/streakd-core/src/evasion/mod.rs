//! Evasion variant generator.
//!
//! For a trigger lemma this derives a family of named regex rules
//! covering the obfuscation tricks seen in live chats: confusable
//! characters and leet digits, separators between letters, zero-width
//! characters, combining diacritics and cross-script transliteration.
//! Output is fully deterministic so a rule can later be recompiled from
//! its name alone.

mod tables;
mod translit;

pub use tables::{COMBINING_JOINER, SPACED_JOINER, ZERO_WIDTH_JOINER};
pub use translit::{transliterate, Transliteration};

use tables::{base_char, confusables_for};

/// Variant kind suffixes, longest first so compound names resolve before
/// their prefixes.
pub const VARIANT_KINDS: &[&str] = &[
    "translit_spaced",
    "translit_zerowidth",
    "translit",
    "lookalike",
    "spaced",
    "zerowidth",
    "diacritics",
];

/// A generated detection rule for one evasion technique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantSpec {
    /// Rule name, `{lemma}_{kind}`.
    pub name: String,
    /// Regex pattern, compiled case-insensitively downstream.
    pub pattern: String,
    /// Human-readable description for admin listings.
    pub description: String,
    /// Example strings the pattern is meant to catch.
    pub examples: Vec<String>,
    /// Whether the rule starts out enabled.
    pub enabled: bool,
}

/// Generates the full variant list for `word`.
///
/// Input is trimmed and lowercased. Words shorter than 3 characters are
/// too ambiguous to pattern-match and yield an empty list. The output
/// order and names are stable for a given word.
pub fn generate_variants(word: &str) -> Vec<VariantSpec> {
    let word = word.trim().to_lowercase();
    if word.chars().count() < 3 {
        return Vec::new();
    }

    let mut variants = Vec::new();
    let translit = transliterate(&word);

    if let Some(t) = &translit {
        variants.push(VariantSpec {
            name: format!("{word}_translit"),
            pattern: format!(r"\b{}\b", t.pattern),
            description: format!("Транслитерация «{word}» → «{}»", t.example),
            examples: vec![t.example.clone()],
            enabled: true,
        });
    }

    variants.push(lookalike_variant(&word));
    variants.push(spaced_variant(&word));
    variants.push(zerowidth_variant(&word));

    if let Some(v) = diacritics_variant(&word) {
        variants.push(v);
    }

    if let Some(t) = &translit {
        variants.push(VariantSpec {
            name: format!("{word}_translit_spaced"),
            pattern: joined_classes(&t.example, tables::SPACED_JOINER),
            description: format!("Транслитерация «{word}» с разделителями"),
            examples: vec![spaced_example(&t.example)],
            enabled: true,
        });
        variants.push(VariantSpec {
            name: format!("{word}_translit_zerowidth"),
            pattern: format!(
                r"\b{}\b",
                joined_classes(&t.example, tables::ZERO_WIDTH_JOINER)
            ),
            description: format!("Транслитерация «{word}» с невидимыми символами"),
            examples: vec![t.example.clone()],
            enabled: true,
        });
    }

    variants
}

/// Character class of `ch` plus its confusables, or the escaped char
/// when nothing is confusable with it.
fn unit_for(ch: char) -> String {
    let Some(subs) = confusables_for(ch) else {
        return regex::escape(&ch.to_string());
    };
    let mut class = String::from("[");
    push_class_char(&mut class, ch);
    for &s in subs {
        push_class_char(&mut class, s);
    }
    class.push(']');
    class
}

fn push_class_char(out: &mut String, ch: char) {
    if matches!(ch, '\\' | ']' | '[' | '^' | '-' | '&' | '~') {
        out.push('\\');
    }
    out.push(ch);
}

/// Per-character confusable classes joined by `joiner`.
fn joined_classes(word: &str, joiner: &str) -> String {
    let units: Vec<String> = word.chars().map(unit_for).collect();
    units.join(joiner)
}

fn lookalike_example(word: &str) -> String {
    word.chars()
        .map(|c| confusables_for(c).and_then(|s| s.first().copied()).unwrap_or(c))
        .collect()
}

fn spaced_example(word: &str) -> String {
    let chars: Vec<String> = word.chars().map(|c| c.to_string()).collect();
    chars.join(" ")
}

fn lookalike_variant(word: &str) -> VariantSpec {
    VariantSpec {
        name: format!("{word}_lookalike"),
        pattern: format!(r"\b{}\b", joined_classes(word, "")),
        description: format!("Замена букв в «{word}» похожими символами"),
        examples: vec![word.to_string(), lookalike_example(word)],
        enabled: true,
    }
}

fn spaced_variant(word: &str) -> VariantSpec {
    VariantSpec {
        name: format!("{word}_spaced"),
        pattern: joined_classes(word, tables::SPACED_JOINER),
        description: format!("«{word}» с разделителями между буквами"),
        examples: vec![spaced_example(word)],
        enabled: true,
    }
}

fn zerowidth_variant(word: &str) -> VariantSpec {
    VariantSpec {
        name: format!("{word}_zerowidth"),
        pattern: format!(r"\b{}\b", joined_classes(word, tables::ZERO_WIDTH_JOINER)),
        description: format!("«{word}» с невидимыми символами"),
        examples: vec![word.to_string()],
        enabled: true,
    }
}

/// Strips combining marks and decomposes precomposed letters.
fn strip_diacritics(word: &str) -> String {
    word.chars()
        .filter(|c| !('\u{0300}'..='\u{036F}').contains(c))
        .map(|c| base_char(c).unwrap_or(c))
        .collect()
}

fn diacritics_variant(word: &str) -> Option<VariantSpec> {
    let stripped = strip_diacritics(word);
    if stripped == word || stripped.chars().count() < 3 {
        return None;
    }
    let mut pattern = String::from(r"\b");
    for ch in stripped.chars() {
        pattern.push_str(&regex::escape(&ch.to_string()));
        pattern.push_str(tables::COMBINING_JOINER);
    }
    pattern.push_str(r"\b");
    Some(VariantSpec {
        name: format!("{word}_diacritics"),
        pattern,
        description: format!("«{stripped}» с диакритическими знаками"),
        examples: vec![stripped],
        enabled: true,
    })
}
