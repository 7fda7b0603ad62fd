//! Uploaded stylesheets, stored under `styles/`.

use std::fmt;
use std::sync::Arc;

use pageforge_storage::{StorageBackend, StorageError};
use tracing::info;

use crate::error::StylesheetError;

/// Key prefix for stylesheets.
pub const STYLES_PREFIX: &str = "styles/";

/// Uploads must be strictly smaller than this (1 MiB).
pub const MAX_STYLESHEET_BYTES: usize = 1_048_576;

/// Reduce an uploaded file name to a safe stylesheet name.
///
/// Takes the last path component (either separator), keeps `[A-Za-z0-9._-]`
/// and strips leading dots. Returns `None` if nothing is left.
#[must_use]
pub fn sanitize_filename(filename: &str) -> Option<String> {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_owned())
    }
}

/// Whether `name` has a `.css` extension, ignoring case.
#[must_use]
pub fn has_css_extension(name: &str) -> bool {
    name.rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("css"))
}

/// Storage key for a stylesheet, or `None` if `name` is not already a
/// sanitized `.css` name.
#[must_use]
pub fn stylesheet_key(name: &str) -> Option<String> {
    let valid = sanitize_filename(name).is_some_and(|clean| clean == name) && has_css_extension(name);
    valid.then(|| format!("{STYLES_PREFIX}{name}"))
}

/// The stylesheet collection.
pub struct StylesheetStore {
    storage: Arc<dyn StorageBackend>,
}

impl fmt::Debug for StylesheetStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StylesheetStore").finish_non_exhaustive()
    }
}

impl StylesheetStore {
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    /// Names of all `.css` files, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`StylesheetError::Storage`] if listing fails.
    pub async fn list(&self) -> Result<Vec<String>, StylesheetError> {
        let keys = self.storage.list(STYLES_PREFIX).await?;
        Ok(keys
            .iter()
            .filter_map(|key| key.strip_prefix(STYLES_PREFIX))
            .filter(|name| !name.contains('/') && has_css_extension(name))
            .map(str::to_owned)
            .collect())
    }

    /// Store an uploaded stylesheet, refusing to overwrite.
    ///
    /// Checks run in order: empty upload, extension, size, name. Returns the
    /// sanitized name the file was stored under.
    ///
    /// # Errors
    ///
    /// Returns the matching [`StylesheetError`] for each rejected check,
    /// [`StylesheetError::AlreadyExists`] if the name is taken, or
    /// [`StylesheetError::Storage`] if the write fails.
    pub async fn upload(&self, filename: &str, bytes: &[u8]) -> Result<String, StylesheetError> {
        if filename.trim().is_empty() || bytes.is_empty() {
            return Err(StylesheetError::Empty);
        }
        if !has_css_extension(filename) {
            return Err(StylesheetError::InvalidExtension {
                filename: filename.to_owned(),
            });
        }
        if bytes.len() >= MAX_STYLESHEET_BYTES {
            return Err(StylesheetError::TooLarge {
                size: bytes.len(),
                limit: MAX_STYLESHEET_BYTES,
            });
        }
        let name = sanitize_filename(filename)
            .filter(|name| has_css_extension(name))
            .ok_or_else(|| StylesheetError::InvalidName {
                filename: filename.to_owned(),
            })?;

        let key = format!("{STYLES_PREFIX}{name}");
        if !self.storage.create(&key, bytes).await? {
            return Err(StylesheetError::AlreadyExists { filename: name });
        }

        info!(stylesheet = %name, size = bytes.len(), "stylesheet uploaded");
        Ok(name)
    }

    /// Contents of a stylesheet. Unknown or malformed names yield `None`.
    ///
    /// # Errors
    ///
    /// Returns [`StylesheetError::Storage`] if the read fails.
    pub async fn get(&self, name: &str) -> Result<Option<Vec<u8>>, StylesheetError> {
        let Some(key) = stylesheet_key(name) else {
            return Ok(None);
        };
        Ok(self.storage.get(&key).await?)
    }

    /// Whether a stylesheet with this exact name has been uploaded.
    ///
    /// # Errors
    ///
    /// Returns the backend's [`StorageError`] if the lookup fails.
    pub async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        match stylesheet_key(name) {
            Some(key) => self.storage.exists(&key).await,
            None => Ok(false),
        }
    }
}
