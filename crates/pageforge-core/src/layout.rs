//! Shared header and footer fragments included by every page.

use std::fmt;
use std::sync::Arc;

use pageforge_storage::StorageBackend;
use tracing::{error, info};

use crate::error::LayoutError;

/// Storage key of the shared header.
pub const HEADER_KEY: &str = "includes/header.php";

/// Storage key of the shared footer.
pub const FOOTER_KEY: &str = "includes/footer.php";

const DEFAULT_HEADER: &str = "<header><nav><a href=\"../pages/\">Home</a></nav></header>";
const DEFAULT_FOOTER: &str = "<footer><p>Powered by PageForge</p></footer>";

/// The current header and footer pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    pub header: String,
    pub footer: String,
}

/// Reads and replaces the shared layout fragments.
pub struct LayoutStore {
    storage: Arc<dyn StorageBackend>,
}

impl fmt::Debug for LayoutStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutStore").finish_non_exhaustive()
    }
}

impl LayoutStore {
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    /// Write the default header and footer if either is missing.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::Storage`] if a write fails.
    pub async fn ensure_defaults(&self) -> Result<(), LayoutError> {
        if self.storage.create(HEADER_KEY, DEFAULT_HEADER.as_bytes()).await? {
            info!(key = HEADER_KEY, "default header written");
        }
        if self.storage.create(FOOTER_KEY, DEFAULT_FOOTER.as_bytes()).await? {
            info!(key = FOOTER_KEY, "default footer written");
        }
        Ok(())
    }

    /// The current layout. A missing fragment reads as empty.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::Storage`] if a read fails.
    pub async fn get(&self) -> Result<Layout, LayoutError> {
        Ok(Layout {
            header: self.read(HEADER_KEY).await?,
            footer: self.read(FOOTER_KEY).await?,
        })
    }

    /// Overwrite both fragments.
    ///
    /// The header is written first. If the footer write then fails, the
    /// previous header is put back so the pair stays consistent.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::Empty`] if either fragment is blank, or
    /// [`LayoutError::Storage`] if a read or write fails.
    pub async fn update(&self, header: &str, footer: &str) -> Result<(), LayoutError> {
        if header.trim().is_empty() || footer.trim().is_empty() {
            return Err(LayoutError::Empty);
        }
        let previous_header = self.storage.get(HEADER_KEY).await?;
        self.storage.put(HEADER_KEY, header.as_bytes()).await?;

        if let Err(e) = self.storage.put(FOOTER_KEY, footer.as_bytes()).await {
            let restored = match &previous_header {
                Some(bytes) => self.storage.put(HEADER_KEY, bytes).await,
                None => self.storage.delete(HEADER_KEY).await,
            };
            if let Err(restore_err) = restored {
                error!(error = %restore_err, "failed to restore header after footer write failed");
            }
            return Err(e.into());
        }

        info!("layout updated");
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<String, LayoutError> {
        let bytes = self.storage.get(key).await?.unwrap_or_default();
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
