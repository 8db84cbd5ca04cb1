//! Diagnostics trace — structured pipeline events for an injected sink.
//!
//! Nothing here is global: a sink is handed to the components that should
//! report, and only when diagnostics were requested in configuration.

use crate::analysis::IntentType;
use crate::pressure::PressureLevel;
use crate::tier::Tier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// A single diagnostics event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceEvent {
    /// The router decided to skip assembly for this turn.
    Skipped { session_id: String, reason: String },
    /// The router picked a tier and source list.
    Routed {
        session_id: String,
        intent: IntentType,
        confidence: f32,
        tier: Tier,
        pressure: PressureLevel,
        sources: Vec<String>,
    },
    /// One adapter call finished (successfully or not).
    AdapterFinished {
        source: String,
        ok: bool,
        items: usize,
        elapsed_ms: u64,
    },
    /// Pre-format selection outcome.
    Selected {
        tier: Tier,
        usable_chars: usize,
        selected: usize,
        dropped: usize,
    },
    /// A post-format degradation step was applied.
    Degraded { tier: Tier, step: String, chars: usize },
    /// Pressure was decayed by a compaction.
    Compacted {
        session_id: String,
        before_bytes: u64,
        after_bytes: u64,
    },
}

/// Where trace events are written.
pub trait TraceSink: Send + Sync {
    fn record(&self, event: &TraceEvent);
}

/// A timestamped trace event, as kept by [`MemoryTraceSink`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceRecord {
    pub timestamp: DateTime<Utc>,
    pub event: TraceEvent,
}

/// In-memory sink that keeps every event. Useful for tests and `--trace`.
#[derive(Default)]
pub struct MemoryTraceSink {
    records: Mutex<Vec<TraceRecord>>,
}

impl MemoryTraceSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events, oldest first.
    pub fn events(&self) -> Vec<TraceEvent> {
        self.lock().iter().map(|r| r.event.clone()).collect()
    }

    pub fn records(&self) -> Vec<TraceRecord> {
        self.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<TraceRecord>> {
        // A panicked writer leaves a valid Vec behind.
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TraceSink for MemoryTraceSink {
    fn record(&self, event: &TraceEvent) {
        self.lock().push(TraceRecord {
            timestamp: Utc::now(),
            event: event.clone(),
        });
    }
}

impl std::fmt::Debug for MemoryTraceSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTraceSink")
            .field("event_count", &self.count())
            .finish()
    }
}

/// Forwards every event to `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTraceSink;

impl TraceSink for LogTraceSink {
    fn record(&self, event: &TraceEvent) {
        match serde_json::to_string(event) {
            Ok(json) => tracing::debug!(target: "briefing::trace", event = %json, "trace"),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize trace event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_keeps_order() {
        let sink = MemoryTraceSink::new();
        sink.record(&TraceEvent::Skipped {
            session_id: "s".into(),
            reason: "empty".into(),
        });
        sink.record(&TraceEvent::AdapterFinished {
            source: "mem".into(),
            ok: true,
            items: 2,
            elapsed_ms: 3,
        });

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], TraceEvent::Skipped { .. }));
        assert!(matches!(events[1], TraceEvent::AdapterFinished { ok: true, .. }));

        sink.clear();
        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(TraceEvent::Degraded {
            tier: Tier::Hot,
            step: "strip_excerpts".into(),
            chars: 180,
        })
        .unwrap();
        assert_eq!(json["type"], "degraded");
        assert_eq!(json["tier"], "hot");
    }
}
