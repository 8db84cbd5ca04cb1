//! File-backed session store — one JSON blob per session id.
//!
//! Storage location: `<state_dir>/<namespace>/<session>.json`, by default
//! under the system temp directory (session state is volatile by nature).
//!
//! Writes go to a temporary sibling first and are then renamed into place,
//! so a crash mid-write leaves the previous blob intact.

use briefing_core::error::StorageError;
use briefing_core::store::SessionStore;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A directory of atomically replaced state files.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// A store for one component under a shared state directory.
    pub fn namespaced(state_dir: &Path, namespace: &str) -> Self {
        Self::new(state_dir.join(namespace))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path for a key. Keys are escaped into a filesystem-safe
    /// alphabet so a hostile id can never escape the store directory.
    pub fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", safe_file_stem(session_id)))
    }

    fn io_error(session_id: &str, e: impl std::fmt::Display) -> StorageError {
        StorageError::Io {
            key: session_id.to_string(),
            reason: e.to_string(),
        }
    }
}

impl SessionStore for FileSessionStore {
    fn name(&self) -> &str {
        "file"
    }

    fn read(&self, session_id: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match fs::read(self.path_for(session_id)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_error(session_id, e)),
        }
    }

    fn write(&self, session_id: &str, bytes: &[u8]) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).map_err(|e| Self::io_error(session_id, e))?;

        let target = self.path_for(session_id);
        let tmp = self.dir.join(format!(
            ".{}.{}.tmp",
            safe_file_stem(session_id),
            std::process::id()
        ));

        let result = (|| -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
            fs::rename(&tmp, &target)
        })();

        if let Err(e) = result {
            let _ = fs::remove_file(&tmp);
            return Err(Self::io_error(session_id, e));
        }

        debug!(path = %target.display(), bytes = bytes.len(), "Session state written");
        Ok(())
    }

    fn remove(&self, session_id: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(session_id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(session_id, e)),
        }
    }
}

/// Escape a key into a file stem. `[A-Za-z0-9_-]` pass through; every
/// other byte becomes `%XX`, so distinct keys never share a file and no
/// stem starts with a dot or contains a separator. The empty key maps to
/// `%`, which no escaped key can produce.
fn safe_file_stem(key: &str) -> String {
    if key.is_empty() {
        return "%".to_string();
    }
    let mut stem = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_') {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("%{byte:02X}"));
        }
    }
    stem
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_blob_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        assert!(store.read("nope").unwrap().is_none());
    }

    #[test]
    fn write_then_read_replaces_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::namespaced(dir.path(), "pressure");

        store.write("s1", b"first").unwrap();
        store.write("s1", b"second").unwrap();
        assert_eq!(store.read("s1").unwrap().unwrap(), b"second");
        assert!(dir.path().join("pressure").join("s1.json").exists());

        // No temp files left behind
        let leftovers: Vec<_> = fs::read_dir(store.dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn hostile_ids_stay_inside_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        let path = store.path_for("../../etc/passwd");
        assert_eq!(path.parent().unwrap(), dir.path());
        assert_eq!(store.path_for("").file_name().unwrap(), "%.json");
    }

    #[test]
    fn distinct_ids_never_share_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        let ids = ["a/b", "a_b", "a.b", "a%2Fb", "", "_", "x.meta", "x"];
        let paths: std::collections::HashSet<_> = ids.iter().map(|id| store.path_for(id)).collect();
        assert_eq!(paths.len(), ids.len());

        store.write("a/b", b"slash").unwrap();
        store.write("a_b", b"underscore").unwrap();
        assert_eq!(store.read("a/b").unwrap().unwrap(), b"slash");
        assert_eq!(store.read("a_b").unwrap().unwrap(), b"underscore");
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        store.write("s1", b"x").unwrap();
        store.remove("s1").unwrap();
        store.remove("s1").unwrap();
        assert!(store.read("s1").unwrap().is_none());
    }
}
