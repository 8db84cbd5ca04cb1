//! Session storage trait — one opaque state blob per session id.
//!
//! Implementations must replace blobs atomically: a reader observes either
//! the previous blob or the new one, never a partial write.

use crate::error::StorageError;
use serde::de::DeserializeOwned;

pub trait SessionStore: Send + Sync {
    /// Short name for logs ("file", "in_memory").
    fn name(&self) -> &str;

    /// Read the blob stored for `session_id`, if any.
    fn read(&self, session_id: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Atomically replace the blob stored for `session_id`.
    fn write(&self, session_id: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Remove the blob for `session_id`. Removing a missing blob is not an error.
    fn remove(&self, session_id: &str) -> Result<(), StorageError>;
}

/// Decode a stored JSON blob, reporting a parse failure as
/// [`StorageError::Corrupt`] for `key`.
pub fn decode_state<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> Result<T, StorageError> {
    serde_json::from_slice(bytes).map_err(|e| StorageError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })
}
