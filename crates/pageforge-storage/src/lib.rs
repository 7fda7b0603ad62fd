//! Storage backend abstraction for `PageForge`.
//!
//! This crate defines the [`StorageBackend`] trait: a pure key-value storage
//! interface that knows nothing about users, pages, or stylesheets. The core
//! crate layers its domain rules (and, for the user store, encryption) on top
//! of whichever backend the server was configured with.
//!
//! Two implementations are provided:
//!
//! - [`FileBackend`]: production default, one file per key under a root directory
//! - [`MemoryBackend`]: in-memory, for testing and throwaway instances

mod error;
mod file_backend;
mod memory;

pub use error::StorageError;
pub use file_backend::FileBackend;
pub use memory::MemoryBackend;

/// A pluggable key-value storage backend.
///
/// Keys are UTF-8 strings using `/` as a separator (e.g. `users.json`,
/// `pages/about.php`, `includes/header.php`). Values are opaque byte arrays.
///
/// Implementations must be safe to share across async tasks (`Send + Sync`).
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Retrieve a value by key.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] if the underlying backend fails, or
    /// [`StorageError::InvalidKey`] if the key cannot be mapped safely.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Store a key-value pair, overwriting any existing value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Write`] if the underlying backend fails.
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Store a key-value pair only if the key does not exist yet.
    ///
    /// Returns `Ok(true)` if the value was written and `Ok(false)` if the key
    /// was already present (the existing value is left untouched).
    ///
    /// The default implementation checks [`exists`](StorageBackend::exists)
    /// and then calls [`put`](StorageBackend::put), which leaves a window
    /// between the two calls. Backends that can create atomically override it.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Write`] if the underlying backend fails.
    async fn create(&self, key: &str, value: &[u8]) -> Result<bool, StorageError> {
        if self.exists(key).await? {
            return Ok(false);
        }
        self.put(key, value).await?;
        Ok(true)
    }

    /// Delete a key. Deleting a non-existent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Delete`] if the underlying backend fails.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// List all keys that start with the given prefix, sorted.
    ///
    /// Returns keys only, not values.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::List`] if the underlying backend fails.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Check whether a key exists in storage.
    ///
    /// The default implementation calls [`get`](StorageBackend::get) and checks
    /// for `Some`. Backends may override this with a more efficient check.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] if the underlying backend fails.
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get(key).await?.is_some())
    }
}
