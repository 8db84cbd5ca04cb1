//! Error types for the briefing domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant. None of these is ever
//! fatal to a turn: the pipeline recovers from every one of them locally.

use thiserror::Error;

/// The top-level error type for all briefing operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Adapter errors ---
    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),

    // --- Storage errors ---
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdapterError {
    #[error("Adapter '{source_name}' failed: {reason}")]
    Failed { source_name: String, reason: String },

    #[error("Adapter '{source_name}' timed out after {timeout_ms}ms")]
    Timeout { source_name: String, timeout_ms: u64 },

    #[error("No adapter registered for source: {0}")]
    NotRegistered(String),
}

impl AdapterError {
    /// Convenience constructor for a generic adapter failure.
    pub fn failed(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O failure on session state '{key}': {reason}")]
    Io { key: String, reason: String },

    #[error("Corrupt session state '{key}': {reason}")]
    Corrupt { key: String, reason: String },
}
