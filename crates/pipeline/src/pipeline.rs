//! Turn-boundary orchestration.
//!
//! The host delivers a handful of signals per session. `BriefingPipeline`
//! answers each by loading the session's pressure and history state,
//! acting, and persisting again, so consecutive signals may come from
//! different processes.
//!
//! | Signal | Effect |
//! |--------|--------|
//! | session start | pressure reset, history cleared |
//! | turn | route, assemble, add prompt + briefing bytes to pressure |
//! | response | record the exchange in history |
//! | compaction | save history, then decay pressure |
//! | session end | save history and write session metadata |
//!
//! Sessions are processed strictly sequentially by the host; no locking
//! across signals for one session is attempted.

use crate::assembler::{Assembler, BriefingMetadata};
use crate::router::{RouteDecision, Router, SkipReason};
use briefing_config::BriefingConfig;
use briefing_core::{
    AdapterRegistry, LogTraceSink, PressureLevel, PromptAnalysis, SessionContext, SessionStore,
    TraceEvent, TraceSink,
};
use briefing_session::{
    FileSessionStore, HistoryCondenser, PressureSnapshot, PressureTracker, SessionMeta,
    SessionSnapshot,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// What a turn produced.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TurnOutcome {
    Skipped {
        reason: SkipReason,
    },
    Briefed {
        briefing: String,
        analysis: PromptAnalysis,
        metadata: BriefingMetadata,
    },
}

impl TurnOutcome {
    /// Text to inject; empty when the turn was skipped.
    pub fn briefing(&self) -> &str {
        match self {
            TurnOutcome::Briefed { briefing, .. } => briefing,
            TurnOutcome::Skipped { .. } => "",
        }
    }

    pub fn metadata(&self) -> Option<&BriefingMetadata> {
        match self {
            TurnOutcome::Briefed { metadata, .. } => Some(metadata),
            TurnOutcome::Skipped { .. } => None,
        }
    }
}

pub struct BriefingPipeline {
    config: BriefingConfig,
    router: Router,
    assembler: Assembler,
    pressure_store: Arc<dyn SessionStore>,
    history_store: Arc<dyn SessionStore>,
    trace: Option<Arc<dyn TraceSink>>,
}

impl BriefingPipeline {
    /// A pipeline persisting under `config.storage`. With
    /// `diagnostics.trace` on, trace events go to the log.
    pub fn new(config: BriefingConfig, registry: AdapterRegistry) -> Self {
        let state_dir = config.storage.resolved_state_dir();
        let pressure_store: Arc<dyn SessionStore> =
            Arc::new(FileSessionStore::namespaced(&state_dir, "pressure"));
        let history_store: Arc<dyn SessionStore> =
            Arc::new(FileSessionStore::namespaced(&state_dir, "history"));
        let trace = config.diagnostics.trace;

        let pipeline = Self::with_stores(config, registry, pressure_store, history_store);
        if trace {
            pipeline.with_trace(Arc::new(LogTraceSink))
        } else {
            pipeline
        }
    }

    /// A pipeline over explicit stores (tests, embedding hosts).
    pub fn with_stores(
        config: BriefingConfig,
        registry: AdapterRegistry,
        pressure_store: Arc<dyn SessionStore>,
        history_store: Arc<dyn SessionStore>,
    ) -> Self {
        let router = Router::new(config.router.clone());
        let assembler = Assembler::new(registry, config.timeouts.clone())
            .with_history_lines(config.history.history_lines_on_degrade);
        Self {
            config,
            router,
            assembler,
            pressure_store,
            history_store,
            trace: None,
        }
    }

    pub fn with_trace(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.assembler = self.assembler.with_trace(sink.clone());
        self.trace = Some(sink);
        self
    }

    pub fn config(&self) -> &BriefingConfig {
        &self.config
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    fn pressure_tracker(&self, session_id: &str) -> PressureTracker {
        PressureTracker::load(
            session_id,
            self.pressure_store.clone(),
            self.config.pressure.clone(),
        )
    }

    fn condenser(&self, session_id: &str) -> HistoryCondenser {
        HistoryCondenser::load(
            session_id,
            self.history_store.clone(),
            self.config.history.clone(),
        )
    }

    fn record(&self, event: TraceEvent) {
        if let Some(sink) = &self.trace {
            sink.record(&event);
        }
    }

    /// Route a prompt under an explicit pressure level, without touching
    /// session state.
    pub fn route(&self, prompt: &str, pressure: PressureLevel) -> RouteDecision {
        self.router.classify(prompt, pressure)
    }

    pub fn on_session_start(&self, session_id: &str) {
        self.pressure_tracker(session_id).reset();
        if let Err(e) = self.condenser(session_id).clear() {
            warn!(session = %session_id, error = %e, "Failed to clear session history");
        }
        info!(session = %session_id, "Session started");
    }

    /// Produce the briefing for a new user prompt.
    pub async fn on_turn(&self, session_id: &str, prompt: &str) -> TurnOutcome {
        let mut pressure = self.pressure_tracker(session_id);
        let prompt_bytes = prompt.len() as u64;

        let plan = match self.router.classify(prompt, pressure.level()) {
            RouteDecision::Skip { reason } => {
                self.record(TraceEvent::Skipped {
                    session_id: session_id.to_string(),
                    reason: reason.as_str().to_string(),
                });
                pressure.increment_turn(prompt_bytes, 0);
                return TurnOutcome::Skipped { reason };
            }
            RouteDecision::Assemble(plan) => plan,
        };

        self.record(TraceEvent::Routed {
            session_id: session_id.to_string(),
            intent: plan.analysis.intent_type,
            confidence: plan.analysis.confidence,
            tier: plan.tier,
            pressure: plan.pressure,
            sources: plan.sources.clone(),
        });

        let history = self.condenser(session_id).get_session_state();
        let context = SessionContext::from_analysis(session_id, &plan.analysis, pressure.state().turn_count);
        let assembled = self.assembler.assemble(&plan, &context, Some(&history)).await;

        pressure.increment_turn(prompt_bytes, assembled.text.len() as u64);

        TurnOutcome::Briefed {
            briefing: assembled.text,
            analysis: plan.analysis,
            metadata: assembled.metadata,
        }
    }

    /// Record the completed exchange.
    pub fn on_response(&self, session_id: &str, user_text: &str, assistant_text: &str) {
        let mut condenser = self.condenser(session_id);
        condenser.record_turn(user_text, assistant_text);
        if let Err(e) = condenser.save() {
            warn!(session = %session_id, error = %e, "Failed to save session history");
        }
    }

    /// The host is about to compact. Returns the decayed byte count.
    pub fn on_compaction(&self, session_id: &str) -> u64 {
        if let Err(e) = self.condenser(session_id).save() {
            warn!(session = %session_id, error = %e, "Failed to save session history before compaction");
        }

        let mut pressure = self.pressure_tracker(session_id);
        let before = pressure.state().cumulative_bytes;
        let after = pressure.mark_compacted();
        self.record(TraceEvent::Compacted {
            session_id: session_id.to_string(),
            before_bytes: before,
            after_bytes: after,
        });
        info!(session = %session_id, before, after, "Session compacted");
        after
    }

    /// Persist history and session metadata. `None` if the metadata could
    /// not be written.
    pub fn on_session_end(&self, session_id: &str) -> Option<SessionMeta> {
        let condenser = self.condenser(session_id);
        if let Err(e) = condenser.save() {
            warn!(session = %session_id, error = %e, "Failed to save session history");
        }
        match condenser.persist_session_meta() {
            Ok(meta) => {
                info!(session = %session_id, turns = meta.turns_recorded, "Session ended");
                Some(meta)
            }
            Err(e) => {
                warn!(session = %session_id, error = %e, "Failed to persist session metadata");
                None
            }
        }
    }

    pub fn pressure(&self, session_id: &str) -> PressureSnapshot {
        self.pressure_tracker(session_id).snapshot()
    }

    pub fn history(&self, session_id: &str) -> SessionSnapshot {
        self.condenser(session_id).get_session_state()
    }

    /// Metadata written at the end of a session, if any.
    pub fn session_meta(&self, session_id: &str) -> Option<SessionMeta> {
        HistoryCondenser::load_session_meta(self.history_store.as_ref(), session_id)
    }
}

impl std::fmt::Debug for BriefingPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BriefingPipeline")
            .field("router", &self.router)
            .field("assembler", &self.assembler)
            .field("pressure_store", &self.pressure_store.name())
            .field("history_store", &self.history_store.name())
            .finish()
    }
}
