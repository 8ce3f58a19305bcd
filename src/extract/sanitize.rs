//! Text cleanup applied to every extracted label and value.
//!
//! Upstream decorates its rows with emoji bullets and entity-escaped
//! punctuation; both must disappear before the text is usable as a record
//! key or value.

use once_cell::sync::Lazy;
use regex::Regex;

static NON_KEY_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());

/// Unescape HTML entities, drop pictographic and invisible code points,
/// and collapse whitespace runs into single spaces.
pub fn clean_text(raw: &str) -> String {
    let unescaped = html_escape::decode_html_entities(raw);
    let filtered: String = unescaped.chars().filter(|ch| !is_stripped(*ch)).collect();
    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}

// Pictographic planes start at U+1F000; variation selectors and the
// zero-width joiner travel with emoji sequences and must go with them.
fn is_stripped(ch: char) -> bool {
    let cp = ch as u32;
    cp >= 0x1F000 || (0xFE00..=0xFE0F).contains(&cp) || cp == 0x200D
}

/// Derive a record key from a cleaned label.
///
/// Keys are lower-case, punctuation-free, and underscore-separated. A label
/// that cleans down to nothing produces an empty key; the extractor drops
/// such rows.
pub fn normalize_key(label: &str) -> String {
    let stripped = NON_KEY_CHARS.replace_all(label, "");
    stripped
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}
