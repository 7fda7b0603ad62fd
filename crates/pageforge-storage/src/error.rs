//! Storage error types.
//!
//! Every variant carries the key (or path) it failed on and the underlying
//! reason, so a log line is enough to diagnose the problem.

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Failed to open the storage backend at the given path.
    #[error("failed to open storage at '{path}': {reason}")]
    Open { path: String, reason: String },

    /// Failed to read a value from storage.
    #[error("failed to read key '{key}': {reason}")]
    Read { key: String, reason: String },

    /// Failed to write a value to storage.
    #[error("failed to write key '{key}': {reason}")]
    Write { key: String, reason: String },

    /// Failed to delete a key from storage.
    #[error("failed to delete key '{key}': {reason}")]
    Delete { key: String, reason: String },

    /// Failed to list keys with the given prefix.
    #[error("failed to list keys with prefix '{prefix}': {reason}")]
    List { prefix: String, reason: String },

    /// A key was malformed (empty segment, `..`, absolute path, null byte).
    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    /// A key resolved to a location outside the backend's root.
    #[error("key '{key}' resolves outside the storage root")]
    OutsideRoot { key: String },
}
