//! Pressure tracker — a session-wide estimate of how full the conversation is.
//!
//! Every turn adds the byte cost of the prompt and the briefing produced for
//! it. A compaction decays the counter to a fixed share of its value (the
//! host summarized rather than erased the history), so the signal keeps
//! some memory of earlier load.
//!
//! State is created lazily on first read, persisted after every mutation,
//! and reset only by an explicit session-start signal.

use briefing_config::PressureConfig;
use briefing_core::{PressureLevel, SessionStore, decode_state};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Persisted per-session counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PressureState {
    /// Monotonic between compactions.
    pub cumulative_bytes: u64,
    /// All-time maximum of `cumulative_bytes` for the session.
    pub peak_bytes: u64,
    pub turn_count: u64,
    /// Set by a compaction, cleared by the next turn.
    pub last_compacted: bool,
}

/// Read-only view handed to callers and the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressureSnapshot {
    #[serde(flatten)]
    pub state: PressureState,
    pub level: PressureLevel,
    /// Advisory turn-count signal, independent of bytes.
    pub long_session: bool,
}

/// Tracks pressure for one session.
pub struct PressureTracker {
    session_id: String,
    store: Arc<dyn SessionStore>,
    config: PressureConfig,
    state: PressureState,
}

impl PressureTracker {
    /// Load the session's state, or start fresh if none is stored or it
    /// cannot be read.
    pub fn load(
        session_id: impl Into<String>,
        store: Arc<dyn SessionStore>,
        config: PressureConfig,
    ) -> Self {
        let session_id = session_id.into();
        let state = Self::read_state(&session_id, store.as_ref());
        Self {
            session_id,
            store,
            config,
            state,
        }
    }

    fn read_state(session_id: &str, store: &dyn SessionStore) -> PressureState {
        let bytes = match store.read(session_id) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return PressureState::default(),
            Err(e) => {
                warn!(session = %session_id, error = %e, "Pressure state unreadable, starting fresh");
                return PressureState::default();
            }
        };

        match decode_state::<PressureState>(session_id, &bytes) {
            Ok(mut state) => {
                if state.peak_bytes < state.cumulative_bytes {
                    warn!(session = %session_id, "Pressure peak below cumulative, repairing");
                    state.peak_bytes = state.cumulative_bytes;
                }
                state
            }
            Err(e) => {
                warn!(session = %session_id, error = %e, "Pressure state corrupt, starting fresh");
                PressureState::default()
            }
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> &PressureState {
        &self.state
    }

    /// Account for content that entered the conversation outside a turn.
    pub fn add_content(&mut self, byte_count: u64) {
        self.state.cumulative_bytes = self.state.cumulative_bytes.saturating_add(byte_count);
        self.bump_peak();
        self.persist();
    }

    /// Record a new turn: the prompt and the briefing injected for it.
    pub fn increment_turn(&mut self, prompt_bytes: u64, briefing_bytes: u64) {
        self.state.turn_count += 1;
        self.state.cumulative_bytes = self
            .state
            .cumulative_bytes
            .saturating_add(prompt_bytes)
            .saturating_add(briefing_bytes);
        self.state.last_compacted = false;
        self.bump_peak();
        self.persist();
    }

    /// Decay the counter after a host compaction. Lossy and irreversible;
    /// the peak is left untouched. Returns the new cumulative value.
    pub fn mark_compacted(&mut self) -> u64 {
        let before = self.state.cumulative_bytes;
        let retain = u128::from(self.config.compaction_retain_percent.min(100));
        let after = (u128::from(before) * retain / 100) as u64;

        self.state.cumulative_bytes = after;
        self.state.last_compacted = true;
        debug!(session = %self.session_id, before, after, "Pressure decayed by compaction");
        self.persist();
        after
    }

    /// Current level from cumulative bytes.
    pub fn level(&self) -> PressureLevel {
        PressureLevel::from_bytes(self.state.cumulative_bytes, self.config.thresholds_bytes())
    }

    /// Whether a compaction happened since the last turn.
    pub fn was_just_compacted(&self) -> bool {
        self.state.last_compacted
    }

    pub fn is_long_session(&self) -> bool {
        self.state.turn_count >= self.config.long_session_turns
    }

    pub fn snapshot(&self) -> PressureSnapshot {
        PressureSnapshot {
            state: self.state.clone(),
            level: self.level(),
            long_session: self.is_long_session(),
        }
    }

    /// Session-start signal: back to zero.
    pub fn reset(&mut self) {
        self.state = PressureState::default();
        self.persist();
    }

    fn bump_peak(&mut self) {
        self.state.peak_bytes = self.state.peak_bytes.max(self.state.cumulative_bytes);
    }

    fn persist(&self) {
        let bytes = match serde_json::to_vec(&self.state) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(session = %self.session_id, error = %e, "Failed to serialize pressure state");
                return;
            }
        };
        if let Err(e) = self.store.write(&self.session_id, &bytes) {
            warn!(
                session = %self.session_id,
                store = self.store.name(),
                error = %e,
                "Failed to persist pressure state"
            );
        }
    }
}

impl std::fmt::Debug for PressureTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PressureTracker")
            .field("session_id", &self.session_id)
            .field("store", &self.store.name())
            .field("state", &self.state)
            .finish()
    }
}
