//! Small, char-safe text helpers shared by the router and the condenser.

use regex_lite::Regex;
use std::sync::LazyLock;

/// File-like tokens: optional directories, a stem, and a known extension.
static FILE_MENTION: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?:[A-Za-z0-9_.\-]+/)*[A-Za-z0-9_\-]+\.(?:rs|py|pyi|ts|tsx|js|jsx|mjs|go|java|kt|rb|c|h|cc|cpp|hpp|cs|swift|php|md|toml|json|ya?ml|sql|sh|html|css|lock|cfg|ini|txt)\b",
    )
    .ok()
});

/// Length in chars (Unicode scalar values), the unit every budget uses.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Keep at most `max` chars. Never splits a character.
pub fn slice_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Cut to `max` chars, marking the cut with an ellipsis that fits inside `max`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if char_len(text) <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out = slice_chars(text, max - 1).trim_end().to_string();
    out.push('…');
    out
}

/// The first sentence (or line) of `text`, trimmed.
pub fn first_sentence(text: &str) -> &str {
    let text = text.trim();
    let end = text
        .char_indices()
        .find(|(i, c)| {
            *c == '\n'
                || (matches!(c, '.' | '!' | '?')
                    && text[i + c.len_utf8()..]
                        .chars()
                        .next()
                        .is_none_or(char::is_whitespace))
        })
        .map(|(i, c)| if c == '\n' { i } else { i + c.len_utf8() })
        .unwrap_or(text.len());
    text[..end].trim()
}

/// Split into sentences on terminal punctuation and newlines.
pub fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = text.trim();
    while !rest.is_empty() {
        let sentence = first_sentence(rest);
        if !sentence.is_empty() {
            out.push(sentence);
        }
        let consumed = rest
            .find(sentence)
            .map(|start| start + sentence.len())
            .unwrap_or(rest.len())
            .max(1);
        rest = rest.get(consumed..).unwrap_or("").trim_start();
    }
    out
}

/// File-like mentions in order of first appearance, deduplicated.
pub fn file_mentions(text: &str) -> Vec<String> {
    let Some(re) = FILE_MENTION.as_ref() else {
        return Vec::new();
    };
    let mut out: Vec<String> = Vec::new();
    for m in re.find_iter(text) {
        let token = m.as_str().trim_start_matches("./").to_string();
        if !out.contains(&token) {
            out.push(token);
        }
    }
    out
}

/// Whitespace-separated word count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
