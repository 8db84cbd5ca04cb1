//! The briefing as structure: an ordered list of typed sections.
//!
//! The assembler builds a [`Briefing`], the enforcer degrades it section by
//! section, and only then is it rendered to text. [`Briefing::parse`] maps
//! rendered text back to the same structure, so text handed in from
//! elsewhere is degraded the same way.
//!
//! Rendered layout:
//!
//! ```text
//! Situation line
//!
//! ## Memory
//! - **title**: summary
//!   > excerpt
//!
//! ## Session History
//! Task: ...
//!
//! _Unavailable sources: delegation_
//! ```

use crate::sources::{section_title, source_for_title};
use briefing_core::text::char_len;
use briefing_core::ContextItem;
use serde::{Deserialize, Serialize};

pub const HISTORY_TITLE: &str = "Session History";
pub const SUGGESTION_TITLE: &str = "Suggestion";
const UNAVAILABLE_PREFIX: &str = "_Unavailable sources: ";
const EXCERPT_PREFIX: &str = "  > ";
const HEADER_PREFIX: &str = "## ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum SectionKind {
    /// Plain leading lines with no header.
    Situation,
    /// Items from one adapter source.
    Source(String),
    SessionHistory,
    Suggestion,
    /// The single trailing line naming failed sources.
    Unavailable,
    /// A header we do not recognize, kept as-is.
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "text", rename_all = "snake_case")]
pub enum Line {
    Text(String),
    Excerpt(String),
}

impl Line {
    pub fn is_excerpt(&self) -> bool {
        matches!(self, Line::Excerpt(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub kind: SectionKind,
    pub lines: Vec<Line>,
}

impl Section {
    pub fn new(kind: SectionKind) -> Self {
        Self {
            kind,
            lines: Vec::new(),
        }
    }

    pub fn situation(text: impl Into<String>) -> Self {
        Self::new(SectionKind::Situation).with_text(text)
    }

    /// A source section with one bullet (and optional excerpt) per item.
    pub fn source(key: &str, items: &[ContextItem]) -> Self {
        let mut section = Self::new(SectionKind::Source(key.to_string()));
        for item in items {
            section.lines.push(Line::Text(item_line(item)));
            if item.has_excerpt() {
                section.lines.push(Line::Excerpt(one_line(&item.excerpt)));
            }
        }
        section
    }

    pub fn unavailable(sources: &[String]) -> Self {
        Self::new(SectionKind::Unavailable).with_text(sources.join(", "))
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let text = one_line(&text.into());
        if !text.is_empty() {
            self.lines.push(Line::Text(text));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn title(&self) -> Option<&str> {
        match &self.kind {
            SectionKind::Source(key) => Some(section_title(key)),
            SectionKind::SessionHistory => Some(HISTORY_TITLE),
            SectionKind::Suggestion => Some(SUGGESTION_TITLE),
            SectionKind::Other(title) => Some(title.as_str()),
            SectionKind::Situation | SectionKind::Unavailable => None,
        }
    }

    fn render_into(&self, out: &mut String) {
        if self.kind == SectionKind::Unavailable {
            let names: Vec<&str> = self
                .lines
                .iter()
                .map(|line| match line {
                    Line::Text(t) | Line::Excerpt(t) => t.as_str(),
                })
                .collect();
            out.push_str(UNAVAILABLE_PREFIX);
            out.push_str(&names.join(", "));
            out.push('_');
            return;
        }

        let mut first = true;
        if let Some(title) = self.title() {
            out.push_str(HEADER_PREFIX);
            out.push_str(title);
            first = false;
        }
        for line in &self.lines {
            if !first {
                out.push('\n');
            }
            first = false;
            match line {
                Line::Text(text) => out.push_str(text),
                Line::Excerpt(text) => {
                    out.push_str(EXCERPT_PREFIX);
                    out.push_str(text);
                }
            }
        }
    }
}

/// An ordered list of sections. Empty sections are never rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Briefing {
    pub sections: Vec<Section>,
}

impl Briefing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, section: Section) {
        if !section.is_empty() {
            self.sections.push(section);
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for section in self.sections.iter().filter(|s| !s.is_empty()) {
            if !out.is_empty() {
                out.push_str("\n\n");
            }
            section.render_into(&mut out);
        }
        out
    }

    /// Rendered length in chars.
    pub fn char_len(&self) -> usize {
        char_len(&self.render())
    }

    pub fn has_section(&self, kind: &SectionKind) -> bool {
        self.sections.iter().any(|s| &s.kind == kind)
    }

    /// Recover the structure of rendered text. Never fails: lines that fit
    /// no known shape are kept as plain text of the current section.
    pub fn parse(text: &str) -> Self {
        let mut briefing = Briefing::new();
        let mut current = Section::new(SectionKind::Situation);

        for raw in text.lines() {
            if let Some(title) = raw.strip_prefix(HEADER_PREFIX) {
                briefing.push(std::mem::replace(&mut current, Section::new(kind_for_title(title.trim()))));
                continue;
            }
            if let Some(names) = raw
                .strip_prefix(UNAVAILABLE_PREFIX)
                .and_then(|rest| rest.strip_suffix('_'))
            {
                briefing.push(std::mem::replace(&mut current, Section::new(SectionKind::Situation)));
                briefing.push(Section::new(SectionKind::Unavailable).with_text(names));
                continue;
            }
            if raw.trim().is_empty() {
                continue;
            }
            match raw.strip_prefix(EXCERPT_PREFIX) {
                Some(excerpt) => current.lines.push(Line::Excerpt(excerpt.to_string())),
                None => current.lines.push(Line::Text(raw.to_string())),
            }
        }
        briefing.push(current);
        briefing
    }
}

fn kind_for_title(title: &str) -> SectionKind {
    match title {
        HISTORY_TITLE => SectionKind::SessionHistory,
        SUGGESTION_TITLE => SectionKind::Suggestion,
        _ => match source_for_title(title) {
            Some(key) => SectionKind::Source(key.to_string()),
            None => SectionKind::Other(title.to_string()),
        },
    }
}

/// `- **title**: summary`, or just the title when there is no summary.
fn item_line(item: &ContextItem) -> String {
    let title = one_line(&item.title);
    let summary = one_line(&item.summary);
    match (title.is_empty(), summary.is_empty()) {
        (false, false) => format!("- **{title}**: {summary}"),
        (false, true) => format!("- **{title}**"),
        _ => format!("- {summary}"),
    }
}

/// Collapse all whitespace runs (including newlines) to single spaces.
fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
