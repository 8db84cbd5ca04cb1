//! Stripping of internal-only annotation markup.
//!
//! Host reminders and previously injected briefings can echo back inside
//! assistant text. They are written once and must never be surfaced again,
//! so anything that re-enters the pipeline passes through here first.

use regex_lite::Regex;
use std::sync::LazyLock;

/// Tags whose entire body is internal-only.
pub const INTERNAL_TAGS: [&str; 3] = ["system-reminder", "internal-note", "briefing"];

static INTERNAL_BLOCKS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    INTERNAL_TAGS
        .iter()
        // An unterminated opening tag swallows the rest of the text.
        .filter_map(|tag| Regex::new(&format!(r"(?s)<{tag}\b[^>]*>.*?(?:</{tag}\s*>|\z)")).ok())
        .collect()
});

static STRAY_CLOSERS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"</(?:system-reminder|internal-note|briefing)\s*>").ok());

static BLANK_RUNS: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\n{3,}").ok());

/// Remove internal annotation blocks and tidy the whitespace they leave.
pub fn strip_internal_markup(text: &str) -> String {
    if !text.contains('<') {
        return text.trim().to_string();
    }

    let mut out = text.to_string();
    for re in INTERNAL_BLOCKS.iter() {
        out = re.replace_all(&out, "").into_owned();
    }
    if let Some(re) = STRAY_CLOSERS.as_ref() {
        out = re.replace_all(&out, "").into_owned();
    }
    if let Some(re) = BLANK_RUNS.as_ref() {
        out = re.replace_all(&out, "\n\n").into_owned();
    }
    out.trim().to_string()
}

/// Whether `text` still carries internal markup.
pub fn contains_internal_markup(text: &str) -> bool {
    INTERNAL_TAGS
        .iter()
        .any(|tag| text.contains(&format!("<{tag}")) || text.contains(&format!("</{tag}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(strip_internal_markup("  fixed the parser  "), "fixed the parser");
        assert_eq!(strip_internal_markup("a < b and c > d"), "a < b and c > d");
    }

    #[test]
    fn reminder_blocks_are_removed() {
        let text = "Done.\n<system-reminder>\nTodo list is empty\n</system-reminder>\nNext step: tests.";
        let clean = strip_internal_markup(text);
        assert_eq!(clean, "Done.\n\nNext step: tests.");
        assert!(!contains_internal_markup(&clean));
    }

    #[test]
    fn tags_with_attributes_are_removed() {
        let text = r#"ok <internal-note kind="budget">secret</internal-note> bye"#;
        assert_eq!(strip_internal_markup(text), "ok  bye");
    }

    #[test]
    fn unterminated_block_drops_the_rest() {
        let text = "visible\n<briefing>\nSituation: debugging";
        assert_eq!(strip_internal_markup(text), "visible");
    }

    #[test]
    fn multiple_blocks_and_stray_closers() {
        let text = "<briefing>a</briefing>keep<system-reminder>b</system-reminder></briefing>";
        assert_eq!(strip_internal_markup(text), "keep");
    }

    #[test]
    fn similarly_named_tags_survive() {
        let text = "<briefings>public</briefings>";
        assert_eq!(strip_internal_markup(text), text);
    }
}
