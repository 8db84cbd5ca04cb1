//! Known source keys, their selection priority, and their section titles.

/// A known adapter source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpec {
    pub key: &'static str,
    pub priority: u8,
    pub title: &'static str,
}

pub const SOURCES: [SourceSpec; 8] = [
    SourceSpec { key: "mem", priority: 10, title: "Memory" },
    SourceSpec { key: "search", priority: 9, title: "Code Search" },
    SourceSpec { key: "kanban", priority: 7, title: "Project State" },
    SourceSpec { key: "crew", priority: 6, title: "Crew Notes" },
    SourceSpec { key: "docs", priority: 4, title: "External Docs" },
    SourceSpec { key: "brainstorm", priority: 3, title: "Brainstorms" },
    SourceSpec { key: "tools", priority: 2, title: "Available Tools" },
    SourceSpec { key: "delegation", priority: 1, title: "Delegation Hints" },
];

/// Sections dropped whole when a rendered briefing is still over budget,
/// least valuable first.
pub const DROP_ORDER: [&str; 5] = ["delegation", "tools", "brainstorm", "docs", "kanban"];

fn spec_for(key: &str) -> Option<&'static SourceSpec> {
    SOURCES.iter().find(|s| s.key == key)
}

/// Selection priority of a source. Unknown sources get 0.
pub fn source_priority(key: &str) -> u8 {
    spec_for(key).map(|s| s.priority).unwrap_or(0)
}

/// Section title for a source; unknown sources are titled by their key.
pub fn section_title(key: &str) -> &str {
    spec_for(key).map(|s| s.title).unwrap_or(key)
}

/// Reverse of [`section_title`] for known sources.
pub fn source_for_title(title: &str) -> Option<&'static str> {
    SOURCES.iter().find(|s| s.title == title).map(|s| s.key)
}

/// The highest-priority known source.
pub fn top_source() -> &'static str {
    SOURCES
        .iter()
        .max_by_key(|s| s.priority)
        .map(|s| s.key)
        .unwrap_or("mem")
}
