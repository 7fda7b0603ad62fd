//! Shared application state for `PageForge` server.
//!
//! A single [`AppState`] is constructed at startup and shared across all
//! Axum handlers via `Arc`. All stores sit on the same storage backend.

use std::sync::Arc;

use pageforge_core::layout::LayoutStore;
use pageforge_core::pages::PageStore;
use pageforge_core::session::SessionStore;
use pageforge_core::styles::StylesheetStore;
use pageforge_core::users::UserStore;
use pageforge_storage::StorageBackend;

use crate::config::ServerConfig;

/// Shared application state passed to all HTTP handlers.
pub struct AppState {
    /// Encrypted user accounts.
    pub users: UserStore,
    /// Generated pages.
    pub pages: PageStore,
    /// Uploaded stylesheets.
    pub styles: StylesheetStore,
    /// Shared header and footer.
    pub layout: LayoutStore,
    /// Live login sessions.
    pub sessions: Arc<SessionStore>,
    /// Host pinned for key derivation, if configured.
    pub store_host: Option<String>,
    /// Whether cookies are marked `Secure`.
    pub secure_cookies: bool,
    /// Request body limit for the admin form.
    pub max_upload_bytes: usize,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    /// Build the state over `storage` using the relevant parts of `config`.
    #[must_use]
    pub fn new(storage: &Arc<dyn StorageBackend>, config: &ServerConfig) -> Self {
        Self {
            users: UserStore::new(Arc::clone(storage), config.store_secret.clone()),
            pages: PageStore::new(Arc::clone(storage)),
            styles: StylesheetStore::new(Arc::clone(storage)),
            layout: LayoutStore::new(Arc::clone(storage)),
            sessions: Arc::new(SessionStore::new(config.session_ttl)),
            store_host: config.store_host.clone(),
            secure_cookies: config.secure_cookies,
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    /// Write the sentinel page and default layout if they are missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend rejects a write.
    pub async fn bootstrap(&self) -> anyhow::Result<()> {
        self.pages.ensure_sentinel().await?;
        self.layout.ensure_defaults().await?;
        Ok(())
    }
}
