//! Prompt analysis — the router's shallow, lexical reading of one user turn.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of intents a prompt can be classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    Debugging,
    Implementation,
    Planning,
    Exploration,
    /// No lexical signal at all. This is the generic fallback bucket: it
    /// is never a runner-up and routes only to the highest-priority
    /// source. Hosts treating "unknown" as exploration should match both.
    Other,
}

impl IntentType {
    /// The scored buckets, in tie-break order.
    pub const SCORED: [IntentType; 4] = [
        IntentType::Debugging,
        IntentType::Implementation,
        IntentType::Planning,
        IntentType::Exploration,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debugging => "debugging",
            Self::Implementation => "implementation",
            Self::Planning => "planning",
            Self::Exploration => "exploration",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for IntentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived from one user message. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptAnalysis {
    /// The raw prompt text.
    pub prompt: String,
    /// Whitespace-separated word count.
    pub word_count: usize,
    /// Highest-scoring intent bucket, or [`IntentType::Other`] when no
    /// bucket scored (confidence is then 0.0).
    pub intent_type: IntentType,
    /// Normalized margin between the top score and the runner-up (0.0–1.0).
    pub confidence: f32,
    /// Other buckets scoring within the closeness margin of the top one.
    pub competing_intents: usize,
    /// Runner-up bucket, if it scored above zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runner_up: Option<IntentType>,
    /// File names and identifiers, in order of first appearance.
    #[serde(default)]
    pub entities: Vec<String>,
    /// The prompt bundles several independent asks.
    pub is_compound: bool,
    /// The prompt refers back to earlier context ("like before", "continue").
    pub requires_history: bool,
}

impl PromptAnalysis {
    /// Whether any bucket matched at all.
    pub fn has_signal(&self) -> bool {
        self.intent_type != IntentType::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_serializes_snake_case() {
        let json = serde_json::to_string(&IntentType::Implementation).unwrap();
        assert_eq!(json, "\"implementation\"");
        assert_eq!(IntentType::Debugging.to_string(), "debugging");
    }

    #[test]
    fn other_has_no_signal() {
        let analysis = PromptAnalysis {
            prompt: "thanks".into(),
            word_count: 1,
            intent_type: IntentType::Other,
            confidence: 0.0,
            competing_intents: 0,
            runner_up: None,
            entities: vec![],
            is_compound: false,
            requires_history: false,
        };
        assert!(!analysis.has_signal());
    }
}
