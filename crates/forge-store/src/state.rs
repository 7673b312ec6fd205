//! Persisted state file
//!
//! One JSON object mapping state keys to each resolved asset's exported
//! fields. Read once when the store opens, rewritten wholesale on save.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::error::StateError;

/// In-memory view of the state file
#[derive(Debug, Clone, Default)]
pub struct StateFile {
    path: Option<PathBuf>,
    entries: BTreeMap<String, Value>,
}

impl StateFile {
    /// Read the state file at `path`
    ///
    /// A missing file yields empty state.
    ///
    /// # Errors
    /// Returns [`StateError::Corrupt`] when the file is not a JSON object and
    /// [`StateError::Io`] when it cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StateError> {
        let path = path.into();
        let entries: BTreeMap<String, Value> = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).map_err(|e| StateError::Corrupt {
                path: path.clone(),
                reason: e.to_string(),
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StateError::Io { path, source }),
        };
        debug!(path = %path.display(), entries = entries.len(), "opened state file");
        Ok(Self {
            path: Some(path),
            entries,
        })
    }

    /// State that is never written to disk
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Backing file, if any
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Entry for a state key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Insert or replace an entry
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    /// Remove an entry, returning it
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    /// State keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write all entries to the backing file
    ///
    /// Creates the parent directory if needed. No-op for in-memory state.
    ///
    /// # Errors
    /// Returns [`StateError`] on serialization or IO failure.
    pub fn save(&self) -> Result<(), StateError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StateError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(path, json).map_err(|source| StateError::Io {
            path: path.clone(),
            source,
        })
    }

    /// Remove the backing file and forget every entry
    ///
    /// # Errors
    /// Returns [`StateError::Io`] when the file exists but cannot be removed.
    pub fn delete(&mut self) -> Result<(), StateError> {
        self.entries.clear();
        let Some(path) = &self.path else {
            return Ok(());
        };
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StateError::Io {
                path: path.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_file_is_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = StateFile::open(dir.path().join(".forge_state.json")).unwrap();
        assert!(state.is_empty());
    }

    #[test]
    fn save_and_reopen_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/.forge_state.json");

        let mut state = StateFile::open(&path).unwrap();
        state.insert("releaseimage.Image", json!({"pull_spec": "quay.io/release:4.6"}));
        state.insert("cluster.ClusterId", json!({"uuid": "x", "infra_id": "y"}));
        state.save().unwrap();

        let reopened = StateFile::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(
            reopened.get("releaseimage.Image").unwrap()["pull_spec"],
            "quay.io/release:4.6"
        );
        assert_eq!(
            reopened.keys().collect::<Vec<_>>(),
            vec!["cluster.ClusterId", "releaseimage.Image"]
        );
    }

    #[test]
    fn corrupt_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".forge_state.json");
        std::fs::write(&path, "not valid json {{{").unwrap();
        assert!(matches!(StateFile::open(&path), Err(StateError::Corrupt { .. })));

        std::fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(matches!(StateFile::open(&path), Err(StateError::Corrupt { .. })));
    }

    #[test]
    fn delete_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".forge_state.json");
        let mut state = StateFile::open(&path).unwrap();
        state.insert("a", json!(1));
        state.save().unwrap();
        assert!(path.exists());

        state.delete().unwrap();
        assert!(!path.exists());
        assert!(state.is_empty());
        state.delete().unwrap();
    }

    #[test]
    fn in_memory_state_never_touches_disk() {
        let mut state = StateFile::in_memory();
        state.insert("a", json!(1));
        state.save().unwrap();
        assert!(state.path().is_none());
        assert_eq!(state.remove("a"), Some(json!(1)));
    }
}
