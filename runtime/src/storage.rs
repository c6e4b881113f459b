//! Key-value storage backends.
//!
//! Two backends cover the widget's storage needs:
//!
//! - [`JsonFileStore`]: the durable store. The whole key space is mirrored
//!   in one JSON object file, rewritten wholesale on every mutation, exactly
//!   as the web storage it replaces rewrote values. Survives restarts, local
//!   to one profile directory.
//! - [`MemoryStore`]: the session store. Lives and dies with the process.
//!
//! A missing or malformed backing file is treated as an empty store and
//! logged; persisted-state corruption must never surface to the user.

use seatwise_core::storage::{KeyValueStore, StorageError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// In-memory store for session-scoped values.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock_entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock_entries()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock_entries().remove(key);
        Ok(())
    }
}

/// Durable store backed by a single JSON file.
///
/// The in-memory map is authoritative between mutations; every `set`/`remove`
/// rewrites the entire file. Writes go through a sibling temp file and rename
/// so a crash mid-write leaves the previous snapshot intact.
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl JsonFileStore {
    /// Open the store at `path`, loading any existing snapshot.
    ///
    /// A missing file starts empty; an unreadable or malformed file is
    /// logged at warn level and also starts empty (the durable mirror is
    /// reconstructible from use, corruption must not be fatal).
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = Self::load_snapshot(&path);
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    fn load_snapshot(path: &Path) -> HashMap<String, String> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return HashMap::new();
            },
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "Failed to read store file, starting empty");
                return HashMap::new();
            },
        };

        match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "Malformed store file, starting empty");
                HashMap::new()
            },
        }
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn persist(&self, key: &str, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        let write_failed = |reason: String| StorageError::WriteFailed {
            key: key.to_string(),
            reason,
        };

        let rendered =
            serde_json::to_string_pretty(entries).map_err(|e| write_failed(e.to_string()))?;

        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, rendered).map_err(|e| write_failed(e.to_string()))?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| write_failed(e.to_string()))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock_entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.lock_entries();
        entries.insert(key.to_string(), value.to_string());
        self.persist(key, &entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.lock_entries();
        entries.remove(key);
        self.persist(key, &entries)
    }
}
