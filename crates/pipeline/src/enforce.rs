//! Post-format safety net: guarantee a briefing fits its tier.
//!
//! Selection works on estimates, and rendering can overshoot them. When the
//! rendered briefing is over `budget - overhead`, a fixed chain of
//! degradations runs on the structured briefing, re-measuring after each
//! step and stopping as soon as it fits:
//!
//! 1. strip excerpt lines
//! 2. drop the Suggestion section
//! 3. cut Session History to its first few lines
//! 4. drop whole sections: delegation, tools, brainstorm, docs, kanban
//! 5. hard char slice
//!
//! Text that already fits is returned untouched, which makes `enforce`
//! idempotent. Nothing here can fail.

use crate::briefing::{Briefing, SectionKind};
use crate::sources::DROP_ORDER;
use briefing_core::text::{char_len, slice_chars};
use briefing_core::Tier;
use serde::Serialize;
use tracing::debug;

/// History lines kept by the text-level entry points.
pub const DEFAULT_HISTORY_LINES: usize = 3;

/// One applied degradation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradeStep {
    StripExcerpts,
    DropSuggestion,
    TruncateHistory,
    DropSection(String),
    HardSlice,
}

impl std::fmt::Display for DegradeStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DegradeStep::StripExcerpts => f.write_str("strip_excerpts"),
            DegradeStep::DropSuggestion => f.write_str("drop_suggestion"),
            DegradeStep::TruncateHistory => f.write_str("truncate_history"),
            DegradeStep::DropSection(key) => write!(f, "drop_section:{key}"),
            DegradeStep::HardSlice => f.write_str("hard_slice"),
        }
    }
}

/// The final text and the steps it took to get there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enforced {
    pub text: String,
    pub steps: Vec<DegradeStep>,
}

impl Enforced {
    pub fn was_degraded(&self) -> bool {
        !self.steps.is_empty()
    }
}

/// Fit already-rendered text to `tier`.
pub fn enforce(text: &str, tier: Tier) -> String {
    let max = tier.max_output_chars();
    if char_len(text) <= max {
        return text.to_string();
    }
    enforce_briefing(Briefing::parse(text), tier, DEFAULT_HISTORY_LINES).text
}

/// [`enforce`] with the tier given by name. Unknown names get the fast budget.
pub fn enforce_named(text: &str, tier_name: &str) -> String {
    enforce(text, Tier::from_name_or_default(tier_name))
}

/// Render `briefing` within `tier`, degrading it as needed.
pub fn enforce_briefing(mut briefing: Briefing, tier: Tier, history_lines: usize) -> Enforced {
    let max = tier.max_output_chars();
    let mut steps = Vec::new();

    let mut rendered = briefing.render();
    if char_len(&rendered) <= max {
        return Enforced {
            text: rendered,
            steps,
        };
    }

    let chain: Vec<DegradeStep> = [
        DegradeStep::StripExcerpts,
        DegradeStep::DropSuggestion,
        DegradeStep::TruncateHistory,
    ]
    .into_iter()
    .chain(DROP_ORDER.iter().map(|key| DegradeStep::DropSection(key.to_string())))
    .collect();

    for step in chain {
        if !apply(&mut briefing, &step, history_lines) {
            continue;
        }
        rendered = briefing.render();
        let chars = char_len(&rendered);
        debug!(tier = %tier, step = %step, chars, max, "Briefing degraded");
        steps.push(step);
        if chars <= max {
            return Enforced {
                text: rendered,
                steps,
            };
        }
    }

    debug!(tier = %tier, max, "Briefing hard-sliced");
    steps.push(DegradeStep::HardSlice);
    Enforced {
        text: slice_chars(&rendered, max).to_string(),
        steps,
    }
}

/// Apply one step. Returns whether anything changed.
fn apply(briefing: &mut Briefing, step: &DegradeStep, history_lines: usize) -> bool {
    match step {
        DegradeStep::StripExcerpts => {
            let mut changed = false;
            for section in &mut briefing.sections {
                let before = section.lines.len();
                section.lines.retain(|line| !line.is_excerpt());
                changed |= section.lines.len() != before;
            }
            briefing.sections.retain(|s| !s.is_empty());
            changed
        }
        DegradeStep::DropSuggestion => remove_sections(briefing, &SectionKind::Suggestion),
        DegradeStep::TruncateHistory => {
            let mut changed = false;
            for section in &mut briefing.sections {
                if section.kind == SectionKind::SessionHistory && section.lines.len() > history_lines {
                    section.lines.truncate(history_lines);
                    changed = true;
                }
            }
            briefing.sections.retain(|s| !s.is_empty());
            changed
        }
        DegradeStep::DropSection(key) => {
            remove_sections(briefing, &SectionKind::Source(key.clone()))
        }
        DegradeStep::HardSlice => false,
    }
}

fn remove_sections(briefing: &mut Briefing, kind: &SectionKind) -> bool {
    let before = briefing.sections.len();
    briefing.sections.retain(|s| &s.kind != kind);
    briefing.sections.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::briefing::Section;
    use briefing_core::ContextItem;

    fn items(source: &str, count: usize, excerpt_len: usize) -> Vec<ContextItem> {
        (0..count)
            .map(|i| {
                ContextItem::new(source, format!("{source} item {i}"))
                    .with_summary("a short summary line")
                    .with_excerpt("x".repeat(excerpt_len))
            })
            .collect()
    }

    fn bloated() -> Briefing {
        let mut b = Briefing::new();
        b.push(Section::situation("Debugging parser.py"));
        b.push(Section::source("mem", &items("mem", 3, 0)));
        b.push(Section::source("search", &items("search", 4, 800)));
        b.push(Section::source("delegation", &items("delegation", 5, 0)));
        let mut history = Section::new(SectionKind::SessionHistory);
        for i in 0..8 {
            history = history.with_text(format!("history line {i} with some words in it"));
        }
        b.push(history);
        b.push(Section::new(SectionKind::Suggestion).with_text("Start from parser.py"));
        b
    }

    #[test]
    fn output_never_exceeds_budget() {
        let long = "word ".repeat(2000);
        for tier in Tier::ALL {
            let max = tier.max_output_chars();
            assert!(char_len(&enforce("", tier)) <= max);
            assert!(char_len(&enforce(&long, tier)) <= max);
            assert!(char_len(&enforce(&bloated().render(), tier)) <= max);
            assert!(char_len(&enforce(&"é".repeat(5000), tier)) <= max);
        }
    }

    #[test]
    fn missing_text_and_unknown_tier_use_fast_budget() {
        let none: Option<&str> = None;
        assert_eq!(enforce(none.unwrap_or_default(), Tier::Hot), "");
        let out = enforce_named(&"y".repeat(5000), "turbo");
        assert_eq!(char_len(&out), Tier::Fast.max_output_chars());
    }

    #[test]
    fn enforce_is_idempotent() {
        let inputs = [
            String::new(),
            "fits already".to_string(),
            bloated().render(),
            "z".repeat(10_000),
        ];
        for input in &inputs {
            for tier in Tier::ALL {
                let once = enforce(input, tier);
                assert_eq!(enforce(&once, tier), once);
            }
        }
    }

    #[test]
    fn fitting_text_is_untouched() {
        let text = "Situation\n\n\n## Weird   spacing\n  > kept";
        assert_eq!(enforce(text, Tier::Slow), text);
    }

    #[test]
    fn excerpts_go_first() {
        let out = enforce_briefing(bloated(), Tier::Slow, DEFAULT_HISTORY_LINES);
        assert_eq!(out.steps, vec![DegradeStep::StripExcerpts]);
        assert!(!out.text.contains("  > "));
        assert!(out.text.contains("## Suggestion"));
        assert!(out.text.contains("## Delegation Hints"));
    }

    #[test]
    fn chain_runs_in_order_until_it_fits() {
        let out = enforce_briefing(bloated(), Tier::Fast, DEFAULT_HISTORY_LINES);
        assert!(char_len(&out.text) <= Tier::Fast.max_output_chars());
        assert_eq!(out.steps[0], DegradeStep::StripExcerpts);
        assert!(!out.steps.contains(&DegradeStep::HardSlice));
        // Memory and search survive; they are never dropped whole
        assert!(out.text.contains("## Memory"));
        assert!(out.text.contains("## Code Search"));
    }

    #[test]
    fn history_is_truncated_before_sources_are_dropped() {
        let mut b = bloated();
        b.sections.retain(|s| s.kind != SectionKind::Source("delegation".into()));
        let max = Tier::Fast.max_output_chars();
        // Pad mem so that only truncating history brings it under budget
        let base = {
            let mut probe = b.clone();
            apply(&mut probe, &DegradeStep::StripExcerpts, 3);
            apply(&mut probe, &DegradeStep::DropSuggestion, 3);
            apply(&mut probe, &DegradeStep::TruncateHistory, 3);
            probe.char_len()
        };
        b.push(Section::situation("p".repeat(max - base - 10)));

        let out = enforce_briefing(b, Tier::Fast, 3);
        assert_eq!(
            out.steps,
            vec![
                DegradeStep::StripExcerpts,
                DegradeStep::DropSuggestion,
                DegradeStep::TruncateHistory
            ]
        );
        assert!(out.text.contains("history line 2"));
        assert!(!out.text.contains("history line 3"));
    }

    #[test]
    fn hard_slice_is_the_last_resort() {
        let mut b = Briefing::new();
        b.push(Section::situation("s".repeat(1000)));
        let out = enforce_briefing(b, Tier::Hot, 3);
        assert_eq!(out.steps, vec![DegradeStep::HardSlice]);
        assert_eq!(char_len(&out.text), Tier::Hot.max_output_chars());
    }
}
