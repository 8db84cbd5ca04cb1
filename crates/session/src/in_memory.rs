//! In-memory session store — for tests and single-process hosts.

use briefing_core::error::StorageError;
use briefing_core::store::SessionStore;
use std::collections::HashMap;
use std::sync::RwLock;

/// A `HashMap` behind a lock. Replacement is trivially atomic.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions.
    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned(session_id: &str) -> StorageError {
        StorageError::Io {
            key: session_id.to_string(),
            reason: "store lock poisoned".into(),
        }
    }
}

impl SessionStore for InMemorySessionStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    fn read(&self, session_id: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let blobs = self.blobs.read().map_err(|_| Self::poisoned(session_id))?;
        Ok(blobs.get(session_id).cloned())
    }

    fn write(&self, session_id: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let mut blobs = self.blobs.write().map_err(|_| Self::poisoned(session_id))?;
        blobs.insert(session_id.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, session_id: &str) -> Result<(), StorageError> {
        let mut blobs = self.blobs.write().map_err(|_| Self::poisoned(session_id))?;
        blobs.remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_read_remove() {
        let store = InMemorySessionStore::new();
        assert!(store.is_empty());
        store.write("a", b"1").unwrap();
        store.write("b", b"2").unwrap();
        assert_eq!(store.read("a").unwrap().unwrap(), b"1");
        assert_eq!(store.len(), 2);
        store.remove("a").unwrap();
        assert!(store.read("a").unwrap().is_none());
    }
}
