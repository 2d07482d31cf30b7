//! Static character data behind the variant generator.
//!
//! Loaded once into immutable maps at first use. The tables cover Latin,
//! Russian Cyrillic and the extra Kazakh/Ukrainian Cyrillic letters that
//! show up in mixed-script obfuscation.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Optional separator run for the spaced variants.
pub const SPACED_JOINER: &str = r"[\s.\-_]{0,3}";

/// Optional run of invisible characters for the zero-width variants
/// (zero-width space/non-joiner/joiner, word joiner, BOM).
pub const ZERO_WIDTH_JOINER: &str = r"[\x{200B}\x{200C}\x{200D}\x{2060}\x{FEFF}]{0,2}";

/// Optional run of combining diacritical marks.
pub const COMBINING_JOINER: &str = r"[\x{0300}-\x{036F}]{0,3}";

/// Visually/phonetically confusable substitutes per base letter.
///
/// The first entry of each row doubles as the display substitute when an
/// example string is rendered for admins.
const CONFUSABLE_ROWS: &[(char, &[char])] = &[
    // Latin
    ('a', &['а', '@', '4']),
    ('b', &['в', '6', 'ь']),
    ('c', &['с', 'ç']),
    ('e', &['е', 'ё', '3']),
    ('h', &['н', 'һ']),
    ('i', &['і', '1', '!', '|']),
    ('k', &['к', 'қ']),
    ('l', &['1', '|']),
    ('m', &['м']),
    ('n', &['п', 'ñ']),
    ('o', &['о', '0', 'ө']),
    ('p', &['р']),
    ('r', &['г']),
    ('s', &['ѕ', '$', '5']),
    ('t', &['т', '7']),
    ('u', &['ц', 'ü']),
    ('x', &['х']),
    ('y', &['у', 'ү']),
    ('z', &['з', '2']),
    // Cyrillic
    ('а', &['a', '@', '4']),
    ('б', &['6', 'b']),
    ('в', &['b', 'v']),
    ('г', &['r', 'ғ']),
    ('е', &['e', 'ё', '3']),
    ('ё', &['е', 'e']),
    ('з', &['3', 'z']),
    ('и', &['u', 'і', 'й']),
    ('й', &['и', 'i']),
    ('к', &['k', 'қ']),
    ('м', &['m']),
    ('н', &['h', 'ң']),
    ('о', &['o', '0', 'ө']),
    ('п', &['n']),
    ('р', &['p']),
    ('с', &['c', '$', '5']),
    ('т', &['t', 'm']),
    ('у', &['y', 'ү', 'ұ']),
    ('х', &['x']),
    ('ч', &['4']),
    ('ь', &['b']),
    ('э', &['e']),
];

static CONFUSABLES: Lazy<HashMap<char, &'static [char]>> =
    Lazy::new(|| CONFUSABLE_ROWS.iter().copied().collect());

/// Returns the confusable substitutes for `ch`, if any.
pub fn confusables_for(ch: char) -> Option<&'static [char]> {
    CONFUSABLES.get(&ch).copied()
}

/// Precomposed letters and the base letter they decompose to.
const PRECOMPOSED_ROWS: &[(char, char)] = &[
    ('ё', 'е'),
    ('й', 'и'),
    ('ѐ', 'е'),
    ('ѝ', 'и'),
    ('ї', 'і'),
    ('à', 'a'),
    ('á', 'a'),
    ('â', 'a'),
    ('ã', 'a'),
    ('ä', 'a'),
    ('å', 'a'),
    ('è', 'e'),
    ('é', 'e'),
    ('ê', 'e'),
    ('ë', 'e'),
    ('ì', 'i'),
    ('í', 'i'),
    ('î', 'i'),
    ('ï', 'i'),
    ('ò', 'o'),
    ('ó', 'o'),
    ('ô', 'o'),
    ('õ', 'o'),
    ('ö', 'o'),
    ('ù', 'u'),
    ('ú', 'u'),
    ('û', 'u'),
    ('ü', 'u'),
    ('ý', 'y'),
    ('ÿ', 'y'),
    ('ñ', 'n'),
    ('ç', 'c'),
    ('š', 's'),
    ('ž', 'z'),
    ('č', 'c'),
    ('ć', 'c'),
];

static PRECOMPOSED: Lazy<HashMap<char, char>> =
    Lazy::new(|| PRECOMPOSED_ROWS.iter().copied().collect());

/// Returns the base letter for a precomposed character, if known.
pub fn base_char(ch: char) -> Option<char> {
    PRECOMPOSED.get(&ch).copied()
}

/// Cyrillic unit → Latin candidate spellings. Empty candidate lists mark
/// silent letters that vanish in transliteration.
pub const RU_TO_LAT: &[(&str, &[&str])] = &[
    ("щ", &["shch", "sch"]),
    ("ж", &["zh", "j"]),
    ("х", &["kh", "h", "x"]),
    ("ц", &["ts", "c"]),
    ("ч", &["ch", "4"]),
    ("ш", &["sh"]),
    ("ю", &["yu", "iu", "u"]),
    ("я", &["ya", "ia"]),
    ("ё", &["yo", "e", "jo"]),
    ("э", &["e"]),
    ("а", &["a"]),
    ("б", &["b"]),
    ("в", &["v", "w"]),
    ("г", &["g"]),
    ("д", &["d"]),
    ("е", &["e", "ye"]),
    ("з", &["z"]),
    ("и", &["i"]),
    ("й", &["y", "i", "j"]),
    ("к", &["k", "c"]),
    ("л", &["l"]),
    ("м", &["m"]),
    ("н", &["n"]),
    ("о", &["o"]),
    ("п", &["p"]),
    ("р", &["r"]),
    ("с", &["s"]),
    ("т", &["t"]),
    ("у", &["u", "oo"]),
    ("ф", &["f", "ph"]),
    ("ы", &["y", "i"]),
    ("ь", &[]),
    ("ъ", &[]),
];

/// Latin unit → Cyrillic candidate spellings. Multi-character units are
/// consumed greedily before single letters.
pub const LAT_TO_RU: &[(&str, &[&str])] = &[
    ("shch", &["щ"]),
    ("sch", &["щ", "ш"]),
    ("zh", &["ж"]),
    ("kh", &["х"]),
    ("ts", &["ц"]),
    ("ch", &["ч"]),
    ("sh", &["ш"]),
    ("yu", &["ю"]),
    ("ya", &["я"]),
    ("yo", &["ё"]),
    ("ye", &["е"]),
    ("ph", &["ф"]),
    ("oo", &["у"]),
    ("a", &["а"]),
    ("b", &["б"]),
    ("c", &["ц", "к", "с"]),
    ("d", &["д"]),
    ("e", &["е", "э"]),
    ("f", &["ф"]),
    ("g", &["г"]),
    ("h", &["х"]),
    ("i", &["и"]),
    ("j", &["дж", "й", "ж"]),
    ("k", &["к"]),
    ("l", &["л"]),
    ("m", &["м"]),
    ("n", &["н"]),
    ("o", &["о"]),
    ("p", &["п"]),
    ("q", &["к"]),
    ("r", &["р"]),
    ("s", &["с"]),
    ("t", &["т"]),
    ("u", &["у", "ю"]),
    ("v", &["в"]),
    ("w", &["в", "у"]),
    ("x", &["кс", "х"]),
    ("y", &["ы", "й", "и"]),
    ("z", &["з"]),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confusables_cover_both_scripts() {
        assert!(confusables_for('a').is_some());
        assert!(confusables_for('о').is_some());
        assert!(confusables_for('q').is_none());
    }

    #[test]
    fn base_char_decomposes_yo() {
        assert_eq!(base_char('ё'), Some('е'));
        assert_eq!(base_char('т'), None);
    }

    #[test]
    fn translit_tables_have_no_duplicate_units() {
        let mut seen = std::collections::HashSet::new();
        for (unit, _) in RU_TO_LAT {
            assert!(seen.insert(*unit), "duplicate unit {unit}");
        }
        seen.clear();
        for (unit, _) in LAT_TO_RU {
            assert!(seen.insert(*unit), "duplicate unit {unit}");
        }
    }
}
