//! Router — shallow lexical classification of a prompt into an intent,
//! a latency tier, and the adapter sources to query.
//!
//! Classification never fails. A prompt nothing matches becomes
//! [`IntentType::Other`] with zero confidence and the minimal source list.

use crate::sources::top_source;
use briefing_config::RouterConfig;
use briefing_core::text::{file_mentions, word_count};
use briefing_core::{IntentType, PressureLevel, PromptAnalysis, Tier};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

/// At most this many entities are extracted from one prompt.
pub const MAX_ENTITIES: usize = 12;

/// Hot-tier prompts must be at least this unambiguous (or carry no signal).
const HOT_MIN_CONFIDENCE: f32 = 0.75;

// ── Lexicon ───────────────────────────────────────────────────────────────

/// Single-word cues. Cues of four or more letters also match as prefixes
/// ("crash" matches "crashes").
fn keywords(intent: IntentType) -> &'static [&'static str] {
    match intent {
        IntentType::Debugging => &[
            "bug", "fix", "error", "crash", "fail", "broken", "traceback", "exception", "panic",
            "debug", "wrong", "regression", "segfault", "stacktrace", "flaky", "hang", "leak",
        ],
        IntentType::Implementation => &[
            "implement", "add", "create", "build", "write", "refactor", "feature", "support",
            "extend", "integrate", "migrate", "rename", "update", "change", "port", "wire",
        ],
        IntentType::Planning => &[
            "plan", "roadmap", "design", "architecture", "approach", "strategy", "prioriti",
            "milestone", "tradeoff", "proposal", "scope", "estimate", "sprint", "backlog",
        ],
        IntentType::Exploration => &[
            "how", "what", "where", "why", "explain", "explan", "understand", "find", "show",
            "overview", "explore", "which", "walk", "describe", "list", "summari",
        ],
        IntentType::Other => &[],
    }
}

/// Multi-word cues, worth two points each.
fn phrases(intent: IntentType) -> &'static [&'static str] {
    match intent {
        IntentType::Debugging => &["doesn't work", "not working", "stack trace", "blows up"],
        IntentType::Implementation => &["hook up", "set up", "make it"],
        IntentType::Planning => &["next steps", "should we", "what order", "break down"],
        IntentType::Exploration => &["tell me about", "look at", "where is", "how does"],
        IntentType::Other => &[],
    }
}

/// Base adapter list per intent.
fn base_sources(intent: IntentType) -> &'static [&'static str] {
    match intent {
        IntentType::Debugging => &["search", "mem", "delegation"],
        IntentType::Implementation => &["mem", "search", "kanban", "delegation"],
        IntentType::Planning => &["mem", "kanban", "brainstorm", "crew"],
        IntentType::Exploration => &["search", "mem", "docs"],
        IntentType::Other => &[],
    }
}

const COMPOUND_CONNECTORS: [&str; 6] = [
    "and also",
    "additionally",
    "as well as",
    "; then",
    ", then",
    "after that",
];

const HISTORY_CUES: [&str; 11] = [
    "like before",
    "as before",
    "continue",
    "where we left",
    "last time",
    "previous",
    "earlier",
    "same as",
    "we discussed",
    "keep going",
    "pick up",
];

static BACKTICKED: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"`([^`\n]+)`").ok());
static CALL_LIKE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b[A-Za-z_][A-Za-z0-9_]*(?:(?:::|\.)[A-Za-z_][A-Za-z0-9_]*)*\(\)").ok());
static IDENTIFIER: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:[a-z][a-z0-9]*(?:_[a-z0-9]+)+|[A-Z][a-z0-9]+(?:[A-Z][a-z0-9]*)+|[a-z]+[A-Z][A-Za-z0-9]*)\b",
    )
    .ok()
});
static ENUMERATED_LINE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\s*(?:\d+[.)]|[-*])\s+\S").ok());

// ── Decision ──────────────────────────────────────────────────────────────

/// Why a turn gets no briefing at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Empty or whitespace-only prompt.
    Empty,
    /// The prompt is a host command.
    Command,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::Empty => "empty",
            SkipReason::Command => "command",
        }
    }
}

/// What to assemble for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePlan {
    pub analysis: PromptAnalysis,
    pub tier: Tier,
    /// Adapter sources to query, most important first, deduplicated.
    pub sources: Vec<String>,
    /// Pressure level the decision was made under.
    pub pressure: PressureLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum RouteDecision {
    Skip { reason: SkipReason },
    Assemble(RoutePlan),
}

impl RouteDecision {
    pub fn plan(&self) -> Option<&RoutePlan> {
        match self {
            RouteDecision::Assemble(plan) => Some(plan),
            RouteDecision::Skip { .. } => None,
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────────

/// Stateless prompt router. Create one per pipeline and reuse it.
#[derive(Debug, Clone, Default)]
pub struct Router {
    config: RouterConfig,
}

impl Router {
    pub fn new(config: RouterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Classify a prompt and decide tier and sources under the given
    /// session pressure.
    pub fn classify(&self, prompt: &str, pressure: PressureLevel) -> RouteDecision {
        let trimmed = prompt.trim();
        if trimmed.is_empty() {
            return RouteDecision::Skip {
                reason: SkipReason::Empty,
            };
        }
        if self
            .config
            .command_markers
            .iter()
            .any(|m| !m.is_empty() && trimmed.starts_with(m.as_str()))
        {
            return RouteDecision::Skip {
                reason: SkipReason::Command,
            };
        }

        let analysis = self.analyze(prompt);
        let tier = self.select_tier(&analysis, pressure);
        let sources = self.select_sources(&analysis, tier);

        debug!(
            intent = %analysis.intent_type,
            confidence = analysis.confidence,
            competing = analysis.competing_intents,
            tier = %tier,
            sources = ?sources,
            "Prompt routed"
        );

        RouteDecision::Assemble(RoutePlan {
            analysis,
            tier,
            sources,
            pressure,
        })
    }

    /// Lexical analysis only, no tier or source decision.
    pub fn analyze(&self, prompt: &str) -> PromptAnalysis {
        let lower = prompt.to_lowercase();
        let tokens: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric() && c != '\'')
            .filter(|t| !t.is_empty())
            .collect();

        let mut scored: Vec<(IntentType, u32)> = IntentType::SCORED
            .iter()
            .map(|&intent| (intent, score_intent(intent, &tokens, &lower)))
            .collect();
        // Stable: ties keep the declaration order of the buckets
        scored.sort_by(|a, b| b.1.cmp(&a.1));

        let (top_intent, top) = scored[0];
        let (runner_intent, runner) = scored[1];

        let (intent_type, confidence, competing_intents, runner_up) = if top == 0 {
            (IntentType::Other, 0.0, 0, None)
        } else {
            let top_f = top as f32;
            let margin = self.config.closeness_margin;
            let competing = scored[1..]
                .iter()
                .filter(|(_, s)| *s > 0 && (top_f - *s as f32) / top_f <= margin)
                .count();
            let runner_up = (runner > 0).then_some(runner_intent);
            (top_intent, (top_f - runner as f32) / top_f, competing, runner_up)
        };

        PromptAnalysis {
            prompt: prompt.to_string(),
            word_count: word_count(prompt),
            intent_type,
            confidence,
            competing_intents,
            runner_up,
            entities: extract_entities(prompt),
            is_compound: is_compound(prompt, &lower),
            requires_history: HISTORY_CUES.iter().any(|cue| lower.contains(cue)),
        }
    }

    fn select_tier(&self, analysis: &PromptAnalysis, pressure: PressureLevel) -> Tier {
        if pressure.is_elevated() {
            return Tier::Slow;
        }
        if analysis.is_compound || analysis.requires_history {
            return Tier::Slow;
        }
        if analysis.has_signal() && analysis.confidence < self.config.low_confidence {
            return Tier::Slow;
        }
        if analysis.word_count <= self.config.hot_max_words
            && analysis.entities.is_empty()
            && (analysis.confidence >= HOT_MIN_CONFIDENCE || !analysis.has_signal())
        {
            return Tier::Hot;
        }
        Tier::Fast
    }

    fn select_sources(&self, analysis: &PromptAnalysis, tier: Tier) -> Vec<String> {
        let cap = self.config.max_sources.max(1);
        let mut sources: Vec<String> = Vec::with_capacity(cap);
        let push = |sources: &mut Vec<String>, key: &str| {
            if sources.len() < cap && !sources.iter().any(|s| s == key) {
                sources.push(key.to_string());
                true
            } else {
                false
            }
        };

        if analysis.has_signal() {
            for key in base_sources(analysis.intent_type) {
                push(&mut sources, key);
            }
        } else {
            push(&mut sources, top_source());
        }

        if let Some(runner_up) = analysis.runner_up {
            let mut bonus = 0;
            for key in base_sources(runner_up) {
                if bonus >= self.config.max_bonus_sources {
                    break;
                }
                if push(&mut sources, key) {
                    bonus += 1;
                }
            }
        }

        if tier == Tier::Slow {
            if let Some(extra) = self.config.slow_extra_source.as_deref() {
                push(&mut sources, extra);
            }
        }

        sources
    }
}

fn score_intent(intent: IntentType, tokens: &[&str], lower: &str) -> u32 {
    let words = tokens
        .iter()
        .filter(|token| {
            keywords(intent)
                .iter()
                .any(|kw| *token == kw || (kw.len() >= 4 && token.starts_with(*kw)))
        })
        .count() as u32;
    let multi = phrases(intent)
        .iter()
        .filter(|phrase| lower.contains(*phrase))
        .count() as u32;
    words + multi * 2
}

fn is_compound(prompt: &str, lower: &str) -> bool {
    if prompt.matches('?').count() >= 2 {
        return true;
    }
    if let Some(re) = ENUMERATED_LINE.as_ref() {
        if prompt.lines().filter(|line| re.is_match(line)).count() >= 2 {
            return true;
        }
    }
    COMPOUND_CONNECTORS.iter().any(|c| lower.contains(c))
}

/// File names, identifiers, call-like tokens and backticked spans, in
/// order of first appearance. Overlapping matches keep the earlier-tried
/// pattern's span.
pub fn extract_entities(prompt: &str) -> Vec<String> {
    let mut spans: Vec<(usize, usize, String)> = Vec::new();
    let take = |spans: &mut Vec<(usize, usize, String)>, start: usize, end: usize, token: &str| {
        let token = token.trim();
        if token.is_empty() || spans.iter().any(|(s, e, _)| start < *e && *s < end) {
            return;
        }
        spans.push((start, end, token.to_string()));
    };

    if let Some(re) = BACKTICKED.as_ref() {
        for caps in re.captures_iter(prompt) {
            if let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) {
                take(&mut spans, whole.start(), whole.end(), inner.as_str());
            }
        }
    }

    for file in file_mentions(prompt) {
        let mut from = 0;
        while let Some(offset) = prompt[from..].find(file.as_str()) {
            let start = from + offset;
            take(&mut spans, start, start + file.len(), &file);
            from = start + file.len();
        }
    }

    for re in [CALL_LIKE.as_ref(), IDENTIFIER.as_ref()].into_iter().flatten() {
        for m in re.find_iter(prompt) {
            take(&mut spans, m.start(), m.end(), m.as_str());
        }
    }

    spans.sort_by_key(|(start, _, _)| *start);
    let mut entities: Vec<String> = Vec::new();
    for (_, _, token) in spans {
        if !entities.contains(&token) {
            entities.push(token);
        }
        if entities.len() == MAX_ENTITIES {
            break;
        }
    }
    entities
}
