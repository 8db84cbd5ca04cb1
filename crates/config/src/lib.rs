//! Configuration loading, validation, and management for the briefing pipeline.
//!
//! Loads configuration from `~/.briefing/config.toml` with environment
//! variable overrides. Validates all settings at load time. Each component
//! receives its own section at construction; nothing reads configuration
//! from global state.

use briefing_core::Tier;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.briefing/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BriefingConfig {
    /// Prompt classification and tier/source selection
    #[serde(default)]
    pub router: RouterConfig,

    /// Adapter fan-out deadlines and limits
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Session pressure thresholds
    #[serde(default)]
    pub pressure: PressureConfig,

    /// History condenser caps
    #[serde(default)]
    pub history: HistoryConfig,

    /// Where session state lives
    #[serde(default)]
    pub storage: StorageConfig,

    /// Diagnostics trace
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

// ── Router ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Prompts at or below this many words may take the hot tier.
    #[serde(default = "default_hot_max_words")]
    pub hot_max_words: usize,

    /// Below this confidence an ambiguous prompt escalates to slow.
    #[serde(default = "default_low_confidence")]
    pub low_confidence: f32,

    /// Relative distance from the top score within which a bucket competes.
    #[serde(default = "default_closeness_margin")]
    pub closeness_margin: f32,

    /// Bonus adapters pulled from the runner-up intent.
    #[serde(default = "default_max_bonus_sources")]
    pub max_bonus_sources: usize,

    /// Hard cap on adapters queried per turn.
    #[serde(default = "default_max_sources")]
    pub max_sources: usize,

    /// Prompts starting with one of these are host commands, not asks.
    #[serde(default = "default_command_markers")]
    pub command_markers: Vec<String>,

    /// Richer reasoning source added on the slow tier.
    #[serde(default = "default_slow_extra_source", skip_serializing_if = "Option::is_none")]
    pub slow_extra_source: Option<String>,
}

fn default_hot_max_words() -> usize {
    4
}
fn default_low_confidence() -> f32 {
    0.34
}
fn default_closeness_margin() -> f32 {
    0.34
}
fn default_max_bonus_sources() -> usize {
    2
}
fn default_max_sources() -> usize {
    6
}
fn default_command_markers() -> Vec<String> {
    vec!["/".into(), "!".into()]
}
fn default_slow_extra_source() -> Option<String> {
    Some("crew".into())
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            hot_max_words: default_hot_max_words(),
            low_confidence: default_low_confidence(),
            closeness_margin: default_closeness_margin(),
            max_bonus_sources: default_max_bonus_sources(),
            max_sources: default_max_sources(),
            command_markers: default_command_markers(),
            slow_extra_source: default_slow_extra_source(),
        }
    }
}

// ── Timeouts ──────────────────────────────────────────────────────────────

/// Deadlines for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierTimeout {
    /// Bound on any single adapter call.
    pub per_adapter_ms: u64,
    /// Bound on the whole fan-out.
    pub total_ms: u64,
}

impl TierTimeout {
    pub fn per_adapter(&self) -> Duration {
        Duration::from_millis(self.per_adapter_ms)
    }

    pub fn total(&self) -> Duration {
        Duration::from_millis(self.total_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Adapter calls in flight at once.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Items kept from any one adapter response.
    #[serde(default = "default_max_items_per_source")]
    pub max_items_per_source: usize,

    #[serde(default = "default_hot_timeout")]
    pub hot: TierTimeout,

    #[serde(default = "default_fast_timeout")]
    pub fast: TierTimeout,

    #[serde(default = "default_slow_timeout")]
    pub slow: TierTimeout,
}

fn default_hot_timeout() -> TierTimeout {
    TierTimeout {
        per_adapter_ms: 80,
        total_ms: 100,
    }
}
fn default_fast_timeout() -> TierTimeout {
    TierTimeout {
        per_adapter_ms: 800,
        total_ms: 1000,
    }
}
fn default_slow_timeout() -> TierTimeout {
    TierTimeout {
        per_adapter_ms: 2500,
        total_ms: 3500,
    }
}
fn default_max_concurrency() -> usize {
    8
}
fn default_max_items_per_source() -> usize {
    8
}

impl TimeoutConfig {
    pub fn for_tier(&self, tier: Tier) -> TierTimeout {
        match tier {
            Tier::Hot => self.hot,
            Tier::Fast => self.fast,
            Tier::Slow => self.slow,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            hot: default_hot_timeout(),
            fast: default_fast_timeout(),
            slow: default_slow_timeout(),
            max_concurrency: default_max_concurrency(),
            max_items_per_source: default_max_items_per_source(),
        }
    }
}

// ── Pressure ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PressureConfig {
    #[serde(default = "default_medium_kb")]
    pub medium_kb: u64,

    #[serde(default = "default_high_kb")]
    pub high_kb: u64,

    #[serde(default = "default_critical_kb")]
    pub critical_kb: u64,

    /// Share of cumulative bytes kept after a compaction.
    #[serde(default = "default_compaction_retain_percent")]
    pub compaction_retain_percent: u8,

    /// Turn count at which a session is considered long (advisory signal).
    #[serde(default = "default_long_session_turns")]
    pub long_session_turns: u64,
}

fn default_medium_kb() -> u64 {
    200
}
fn default_high_kb() -> u64 {
    400
}
fn default_critical_kb() -> u64 {
    600
}
fn default_compaction_retain_percent() -> u8 {
    30
}
fn default_long_session_turns() -> u64 {
    40
}

impl PressureConfig {
    /// `[medium, high, critical]` in bytes.
    pub fn thresholds_bytes(&self) -> [u64; 3] {
        [
            self.medium_kb.saturating_mul(1024),
            self.high_kb.saturating_mul(1024),
            self.critical_kb.saturating_mul(1024),
        ]
    }
}

impl Default for PressureConfig {
    fn default() -> Self {
        Self {
            medium_kb: default_medium_kb(),
            high_kb: default_high_kb(),
            critical_kb: default_critical_kb(),
            compaction_retain_percent: default_compaction_retain_percent(),
            long_session_turns: default_long_session_turns(),
        }
    }
}

// ── History ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_max_recent_turns")]
    pub max_recent_turns: usize,

    #[serde(default = "default_max_topics")]
    pub max_topics: usize,

    #[serde(default = "default_max_decisions")]
    pub max_decisions: usize,

    #[serde(default = "default_max_files")]
    pub max_files: usize,

    #[serde(default = "default_max_summary_chars")]
    pub max_summary_chars: usize,

    /// Each side of a verbatim turn is cut to this many chars.
    #[serde(default = "default_max_turn_chars")]
    pub max_turn_chars: usize,

    /// Lines a session-history section keeps when a briefing is degraded.
    #[serde(default = "default_history_lines_on_degrade")]
    pub history_lines_on_degrade: usize,
}

fn default_max_recent_turns() -> usize {
    4
}
fn default_max_topics() -> usize {
    8
}
fn default_max_decisions() -> usize {
    8
}
fn default_max_files() -> usize {
    12
}
fn default_max_summary_chars() -> usize {
    1200
}
fn default_max_turn_chars() -> usize {
    400
}
fn default_history_lines_on_degrade() -> usize {
    3
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_recent_turns: default_max_recent_turns(),
            max_topics: default_max_topics(),
            max_decisions: default_max_decisions(),
            max_files: default_max_files(),
            max_summary_chars: default_max_summary_chars(),
            max_turn_chars: default_max_turn_chars(),
            history_lines_on_degrade: default_history_lines_on_degrade(),
        }
    }
}

// ── Storage & diagnostics ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for session state. Defaults to a temp-dir location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolved_state_dir(&self) -> PathBuf {
        self.state_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("briefing-sessions"))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Record pipeline trace events.
    #[serde(default)]
    pub trace: bool,
}

// ── Loading ───────────────────────────────────────────────────────────────

impl BriefingConfig {
    /// Load configuration from the default path (~/.briefing/config.toml).
    ///
    /// Environment variables override file values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    ///
    /// - `BRIEFING_STATE_DIR` — session state directory
    /// - `BRIEFING_TRACE` — `1`/`true` enables the diagnostics trace
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("BRIEFING_STATE_DIR").filter(|d| !d.trim().is_empty()) {
            self.storage.state_dir = Some(PathBuf::from(dir));
        }
        if let Some(flag) = lookup("BRIEFING_TRACE") {
            self.diagnostics.trace = matches!(flag.trim(), "1" | "true" | "yes" | "on");
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".briefing")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.pressure;
        if !(p.medium_kb < p.high_kb && p.high_kb < p.critical_kb) {
            return Err(ConfigError::ValidationError(
                "pressure thresholds must satisfy medium_kb < high_kb < critical_kb".into(),
            ));
        }
        if p.compaction_retain_percent > 100 {
            return Err(ConfigError::ValidationError(
                "compaction_retain_percent must be between 0 and 100".into(),
            ));
        }

        let r = &self.router;
        for (name, value) in [
            ("low_confidence", r.low_confidence),
            ("closeness_margin", r.closeness_margin),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ValidationError(format!(
                    "router.{name} must be between 0.0 and 1.0"
                )));
            }
        }
        if r.max_sources == 0 {
            return Err(ConfigError::ValidationError(
                "router.max_sources must be at least 1".into(),
            ));
        }

        let t = &self.timeouts;
        for tier in Tier::ALL {
            let timeout = t.for_tier(tier);
            if timeout.per_adapter_ms == 0 || timeout.total_ms == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "timeouts.{tier} must be greater than zero"
                )));
            }
            if timeout.per_adapter_ms > timeout.total_ms {
                return Err(ConfigError::ValidationError(format!(
                    "timeouts.{tier}.per_adapter_ms must not exceed total_ms"
                )));
            }
        }
        if t.max_concurrency == 0 || t.max_items_per_source == 0 {
            return Err(ConfigError::ValidationError(
                "timeouts.max_concurrency and max_items_per_source must be at least 1".into(),
            ));
        }

        let h = &self.history;
        if [h.max_recent_turns, h.max_topics, h.max_decisions, h.max_files]
            .iter()
            .any(|cap| *cap == 0)
        {
            return Err(ConfigError::ValidationError(
                "history list caps must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = BriefingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.router.max_bonus_sources, 2);
        assert_eq!(config.pressure.compaction_retain_percent, 30);
        assert_eq!(
            config.pressure.thresholds_bytes(),
            [200 * 1024, 400 * 1024, 600 * 1024]
        );
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = BriefingConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: BriefingConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.timeouts.fast, config.timeouts.fast);
        assert_eq!(parsed.router.command_markers, config.router.command_markers);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[pressure]
medium_kb = 100

[timeouts.slow]
per_adapter_ms = 1000
total_ms = 2000
"#,
        )
        .unwrap();

        let config = BriefingConfig::load_from(&path).unwrap();
        assert_eq!(config.pressure.medium_kb, 100);
        assert_eq!(config.pressure.high_kb, 400);
        assert_eq!(config.timeouts.slow.total_ms, 2000);
        assert_eq!(config.timeouts.hot, default_hot_timeout());
    }

    #[test]
    fn unordered_thresholds_rejected() {
        let config = BriefingConfig {
            pressure: PressureConfig {
                medium_kb: 500,
                ..PressureConfig::default()
            },
            ..BriefingConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn per_adapter_timeout_above_total_rejected() {
        let mut config = BriefingConfig::default();
        config.timeouts.fast = TierTimeout {
            per_adapter_ms: 5000,
            total_ms: 1000,
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("fast"));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "router = 7").unwrap();
        assert!(matches!(
            BriefingConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = BriefingConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.router.hot_max_words, 4);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = BriefingConfig::default();
        config.apply_env(|key| match key {
            "BRIEFING_STATE_DIR" => Some("/var/tmp/briefing".into()),
            "BRIEFING_TRACE" => Some("true".into()),
            _ => None,
        });
        assert_eq!(
            config.storage.resolved_state_dir(),
            PathBuf::from("/var/tmp/briefing")
        );
        assert!(config.diagnostics.trace);
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = BriefingConfig::default_toml();
        assert!(toml_str.contains("hot_max_words"));
        assert!(toml_str.contains("compaction_retain_percent"));
    }
}
