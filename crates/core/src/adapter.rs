//! Adapter trait — the read-only sources a briefing is assembled from.
//!
//! Every external source (memory store, task board, code-search index,
//! brainstorm log, tool-discovery probe, ...) implements this trait.
//! Adapters are registered in the [`AdapterRegistry`] and queried
//! concurrently by the assembler.

use crate::analysis::PromptAnalysis;
use crate::error::AdapterError;
use crate::item::ContextItem;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// What an adapter may know about the turn it is answering.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub session_id: String,
    /// Entities the router extracted from the prompt.
    pub entities: Vec<String>,
    /// Number of turns already recorded for the session.
    pub turn: u64,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Default::default()
        }
    }

    pub fn from_analysis(session_id: impl Into<String>, analysis: &PromptAnalysis, turn: u64) -> Self {
        Self {
            session_id: session_id.into(),
            entities: analysis.entities.clone(),
            turn,
        }
    }
}

/// A stateless, read-only source of context items.
///
/// Implementations must tolerate being dropped mid-flight: the assembler
/// cancels any call that outlives its tier deadline.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// The source key this adapter answers for (e.g. "mem", "search").
    fn name(&self) -> &str;

    /// Return the items relevant to this prompt.
    async fn query(
        &self,
        prompt: &str,
        context: &SessionContext,
    ) -> std::result::Result<Vec<ContextItem>, AdapterError>;
}

/// Registry of all available adapters, keyed by source name.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn Adapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter. Replaces any existing adapter with the same name.
    pub fn register(&mut self, adapter: Arc<dyn Adapter>) {
        let name = adapter.name().to_string();
        self.adapters.insert(name, adapter);
    }

    /// Builder-style registration.
    pub fn with(mut self, adapter: Arc<dyn Adapter>) -> Self {
        self.register(adapter);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Adapter>> {
        self.adapters.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.adapters.contains_key(name)
    }

    /// Registered source names, sorted for stable output.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.adapters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("adapters", &self.names())
            .finish()
    }
}
