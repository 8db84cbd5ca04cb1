//! Latency tiers and their character budgets.
//!
//! | Tier | Budget | Usable (budget − overhead) |
//! |------|--------|----------------------------|
//! | hot  | 400    | 200                        |
//! | fast | 2000   | 1800                       |
//! | slow | 4000   | 3800                       |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Characters reserved in every tier for the host's wrapper markup.
pub const OVERHEAD_CHARS: usize = 200;

/// A latency tier for a single context-assembly call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Sub-100ms, tiny budget. Short, unambiguous prompts.
    Hot,
    /// Around one second. The default.
    Fast,
    /// A few seconds, largest budget, history-aware.
    Slow,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Hot, Tier::Fast, Tier::Slow];

    /// Total character budget for the tier, wrapper overhead included.
    pub fn budget_chars(self) -> usize {
        match self {
            Self::Hot => 400,
            Self::Fast => 2000,
            Self::Slow => 4000,
        }
    }

    /// Maximum length of the rendered briefing text.
    pub fn max_output_chars(self) -> usize {
        self.budget_chars().saturating_sub(OVERHEAD_CHARS)
    }

    /// Budget left for items once wrapper overhead and any pre-rendered
    /// text are accounted for. Clamped at zero.
    pub fn usable_chars(self, reserved_chars: usize) -> usize {
        self.max_output_chars().saturating_sub(reserved_chars)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hot => "hot",
            Self::Fast => "fast",
            Self::Slow => "slow",
        }
    }

    /// Parse a tier name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "hot" => Some(Self::Hot),
            "fast" => Some(Self::Fast),
            "slow" => Some(Self::Slow),
            _ => None,
        }
    }

    /// Parse a tier name, falling back to [`Tier::Fast`] for unknown names.
    pub fn from_name_or_default(name: &str) -> Self {
        Self::from_name(name).unwrap_or_default()
    }
}

impl Default for Tier {
    fn default() -> Self {
        Self::Fast
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown tier: {s}"))
    }
}
