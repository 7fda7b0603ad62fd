//! Generated pages, stored under `pages/`.
//!
//! Page files are named after their title (see [`render::page_filename`]), so
//! every file this module writes matches `[a-z0-9]+\.php`. The directory also
//! holds a sentinel `index.php` that is never listed, served, or deleted.

use std::fmt;
use std::sync::Arc;

use pageforge_storage::StorageBackend;
use tracing::{info, warn};

use crate::error::PageError;
use crate::layout::Layout;
use crate::render;
use crate::styles::StylesheetStore;

/// Key prefix for pages.
pub const PAGES_PREFIX: &str = "pages/";

/// Reserved directory index inside `pages/`.
pub const SENTINEL: &str = "index.php";

const SENTINEL_BODY: &str = "<?php header('Location: ../admin'); ?>\n";

/// Whether `name` has the shape of a generated page file.
#[must_use]
pub fn is_page_filename(name: &str) -> bool {
    name.strip_suffix(".php").is_some_and(|stem| {
        !stem.is_empty()
            && stem
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
    })
}

/// A page created by [`PageStore::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPage {
    pub filename: String,
}

impl CreatedPage {
    /// Where the page is served.
    #[must_use]
    pub fn url(&self) -> String {
        format!("/{PAGES_PREFIX}{}", self.filename)
    }
}

/// The page collection.
pub struct PageStore {
    storage: Arc<dyn StorageBackend>,
    styles: StylesheetStore,
}

impl fmt::Debug for PageStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageStore").finish_non_exhaustive()
    }
}

impl PageStore {
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            styles: StylesheetStore::new(Arc::clone(&storage)),
            storage,
        }
    }

    /// Write the sentinel index file if it is missing.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Storage`] if the write fails.
    pub async fn ensure_sentinel(&self) -> Result<(), PageError> {
        let key = format!("{PAGES_PREFIX}{SENTINEL}");
        if self.storage.create(&key, SENTINEL_BODY.as_bytes()).await? {
            info!(key = %key, "sentinel page written");
        }
        Ok(())
    }

    /// File names of all pages except the sentinel, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Storage`] if listing fails.
    pub async fn list(&self) -> Result<Vec<String>, PageError> {
        let keys = self.storage.list(PAGES_PREFIX).await?;
        Ok(keys
            .iter()
            .filter_map(|key| key.strip_prefix(PAGES_PREFIX))
            .filter(|name| *name != SENTINEL && !name.contains('/') && name.ends_with(".php"))
            .map(str::to_owned)
            .collect())
    }

    /// Render and store a new page.
    ///
    /// # Errors
    ///
    /// - [`PageError::EmptyFilename`] if the title has no letters or digits
    /// - [`PageError::Reserved`] if the title maps onto the sentinel
    /// - [`PageError::StylesheetMissing`] if `css` has not been uploaded
    /// - [`PageError::AlreadyExists`] if a page with that name exists
    /// - [`PageError::Storage`] if the backend fails
    pub async fn create(
        &self,
        title: &str,
        content: &str,
        css: &str,
    ) -> Result<CreatedPage, PageError> {
        let filename = render::page_filename(title).ok_or_else(|| PageError::EmptyFilename {
            title: title.to_owned(),
        })?;
        if filename == SENTINEL {
            return Err(PageError::Reserved { name: filename });
        }

        if !self.styles.exists(css).await? {
            return Err(PageError::StylesheetMissing {
                name: css.to_owned(),
            });
        }

        let document = render::render_page_file(title, content, css);
        let key = format!("{PAGES_PREFIX}{filename}");
        if !self.storage.create(&key, document.as_bytes()).await? {
            return Err(PageError::AlreadyExists { filename });
        }

        info!(page = %filename, css, "page created");
        Ok(CreatedPage { filename })
    }

    /// Delete a page by its submitted name.
    ///
    /// Only the last path component of `name` is used, so a submitted
    /// `../../users.json` refers to `pages/users.json` and nothing else.
    ///
    /// # Errors
    ///
    /// - [`PageError::OutsideDirectory`] if no usable component is left
    /// - [`PageError::Reserved`] for the sentinel
    /// - [`PageError::NotFound`] if there is no such page
    /// - [`PageError::Storage`] if the backend fails
    pub async fn delete(&self, name: &str) -> Result<String, PageError> {
        let base = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
        if base.is_empty() || base == "." || base == ".." {
            warn!(name, "rejected page delete outside the pages directory");
            return Err(PageError::OutsideDirectory {
                name: name.to_owned(),
            });
        }
        if base == SENTINEL {
            return Err(PageError::Reserved {
                name: base.to_owned(),
            });
        }
        if !is_page_filename(base) {
            return Err(PageError::NotFound {
                filename: base.to_owned(),
            });
        }

        let key = format!("{PAGES_PREFIX}{base}");
        if !self.storage.exists(&key).await? {
            return Err(PageError::NotFound {
                filename: base.to_owned(),
            });
        }
        self.storage.delete(&key).await?;

        info!(page = %base, "page deleted");
        Ok(base.to_owned())
    }

    /// The stored page file, or `None` for unknown names and the sentinel.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Storage`] if the read fails.
    pub async fn read(&self, filename: &str) -> Result<Option<String>, PageError> {
        if filename == SENTINEL || !is_page_filename(filename) {
            return Ok(None);
        }
        let bytes = self.storage.get(&format!("{PAGES_PREFIX}{filename}")).await?;
        Ok(bytes.map(|b| String::from_utf8_lossy(&b).into_owned()))
    }

    /// The page as served: its include directives replaced by `layout`.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Storage`] if the read fails.
    pub async fn view(&self, filename: &str, layout: &Layout) -> Result<Option<String>, PageError> {
        Ok(self
            .read(filename)
            .await?
            .map(|file| render::expand_includes(&file, &layout.header, &layout.footer)))
    }
}
