//! Context pressure levels.
//!
//! The level is a coarse view over a session's cumulative content bytes.
//! Thresholds are inclusive lower bounds: 200 KiB is already MEDIUM.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How "full" the conversation has become.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PressureLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl PressureLevel {
    /// Classify a byte count against `[medium, high, critical]` thresholds.
    pub fn from_bytes(bytes: u64, thresholds: [u64; 3]) -> Self {
        let [medium, high, critical] = thresholds;
        if bytes >= critical {
            Self::Critical
        } else if bytes >= high {
            Self::High
        } else if bytes >= medium {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// HIGH and CRITICAL force richer recovery context.
    pub fn is_elevated(self) -> bool {
        self >= Self::High
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl Default for PressureLevel {
    fn default() -> Self {
        Self::Low
    }
}

impl fmt::Display for PressureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KIB: u64 = 1024;
    const THRESHOLDS: [u64; 3] = [200 * KIB, 400 * KIB, 600 * KIB];

    #[test]
    fn thresholds_are_inclusive() {
        assert_eq!(PressureLevel::from_bytes(0, THRESHOLDS), PressureLevel::Low);
        assert_eq!(
            PressureLevel::from_bytes(200 * KIB - 1, THRESHOLDS),
            PressureLevel::Low
        );
        assert_eq!(
            PressureLevel::from_bytes(200 * KIB, THRESHOLDS),
            PressureLevel::Medium
        );
        assert_eq!(
            PressureLevel::from_bytes(400 * KIB, THRESHOLDS),
            PressureLevel::High
        );
        assert_eq!(
            PressureLevel::from_bytes(600 * KIB, THRESHOLDS),
            PressureLevel::Critical
        );
    }

    #[test]
    fn elevated_levels() {
        assert!(!PressureLevel::Medium.is_elevated());
        assert!(PressureLevel::High.is_elevated());
        assert!(PressureLevel::Critical.is_elevated());
    }
}
