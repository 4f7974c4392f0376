//! Removal of East Asian script characters from review text.

use serde_json::Value;

/// CJK Unified Ideographs, Hiragana, Katakana and Hangul (syllables and jamo).
pub fn is_cjk(c: char) -> bool {
    matches!(
        c,
        '\u{4E00}'..='\u{9FFF}'
            | '\u{3040}'..='\u{309F}'
            | '\u{30A0}'..='\u{30FF}'
            | '\u{AC00}'..='\u{D7AF}'
            | '\u{1100}'..='\u{11FF}'
    )
}

pub fn strip_cjk(text: &str) -> String {
    text.chars().filter(|c| !is_cjk(*c)).collect()
}

/// Strips CJK characters from every string value under `value`. Object keys
/// are left as they are.
pub fn strip_cjk_in_place(value: &mut Value) {
    match value {
        Value::String(s) => {
            if s.chars().any(is_cjk) {
                *s = strip_cjk(s);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(strip_cjk_in_place),
        Value::Object(map) => map.values_mut().for_each(strip_cjk_in_place),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}
