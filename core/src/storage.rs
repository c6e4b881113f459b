//! Key-value storage abstraction.
//!
//! The widget persists its state into two string-keyed stores: a durable
//! store (survives restarts, local to one profile) and a session store
//! (identity for the current session). Both sit behind the same trait so the
//! domain layer never cares which backend it is talking to.
//!
//! Values are opaque strings; the domain layer encodes JSON into them and is
//! responsible for recovering from malformed content (treat as empty, log,
//! never propagate to the user).

use thiserror::Error;

/// Errors raised by a key-value store backend.
#[derive(Error, Debug, Clone)]
pub enum StorageError {
    /// Failed to read a key
    #[error("Read failed for key '{key}': {reason}")]
    ReadFailed {
        /// The key that failed
        key: String,
        /// The reason for failure
        reason: String,
    },

    /// Failed to write a key
    #[error("Write failed for key '{key}': {reason}")]
    WriteFailed {
        /// The key that failed
        key: String,
        /// The reason for failure
        reason: String,
    },
}

/// String-keyed, string-valued store.
///
/// Mirrors the web storage contract: `get`/`set`/`remove`, whole values
/// rewritten on every mutation, no partial updates.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadFailed`] if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::WriteFailed`] if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key` if present.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::WriteFailed`] if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
