//! Filesystem storage backend, the production default.
//!
//! Every key maps to one file below a root directory: `pages/about.php` lives
//! at `<root>/pages/about.php`. That keeps the data directory directly usable
//! by a plain web server and easy to inspect by hand.
//!
//! # Containment
//!
//! Keys are validated segment by segment (no empty, `.` or `..` segments, no
//! absolute paths, no backslashes or drive prefixes) before they are joined
//! to the root. After joining, the resolved location is canonicalized and
//! must still start with the canonical root, so a symlink planted inside the
//! data directory cannot redirect a read, write, or delete outside it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::{StorageBackend, StorageError};

/// A storage backend that keeps one file per key under a root directory.
///
/// # Examples
///
/// ```no_run
/// # use pageforge_storage::FileBackend;
/// let backend = FileBackend::open("/var/lib/pageforge").unwrap();
/// ```
#[derive(Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl std::fmt::Debug for FileBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileBackend")
            .field("root", &self.root)
            .finish()
    }
}

impl FileBackend {
    /// Open a file backend rooted at the given directory.
    ///
    /// Creates the directory if it does not exist and stores its canonical
    /// form for containment checks.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the directory cannot be created or
    /// canonicalized.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let open_err = |e: std::io::Error| StorageError::Open {
            path: path.display().to_string(),
            reason: e.to_string(),
        };

        std::fs::create_dir_all(path).map_err(open_err)?;
        let root = std::fs::canonicalize(path).map_err(open_err)?;

        Ok(Self { root })
    }

    /// Map a key to its on-disk location without touching the filesystem.
    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    /// Fail unless `location` canonicalizes to somewhere below the root.
    async fn ensure_contained(&self, key: &str, location: &Path) -> Result<(), StorageError> {
        let real = fs::canonicalize(location)
            .await
            .map_err(|e| StorageError::Read {
                key: key.to_owned(),
                reason: e.to_string(),
            })?;
        if real.starts_with(&self.root) {
            Ok(())
        } else {
            warn!(key, "storage key resolved outside the data directory");
            Err(StorageError::OutsideRoot { key: key.to_owned() })
        }
    }

    /// Create the parent directory of `path` and verify it is contained.
    async fn prepare_parent(&self, key: &str, path: &Path) -> Result<(), StorageError> {
        let parent = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent)
            .await
            .map_err(|e| StorageError::Write {
                key: key.to_owned(),
                reason: format!("failed to create directory: {e}"),
            })?;
        self.ensure_contained(key, parent).await
    }
}

/// Reject keys that could escape the root or map ambiguously onto the disk.
fn validate_key(key: &str) -> Result<(), StorageError> {
    let invalid = |reason: &str| StorageError::InvalidKey {
        key: key.to_owned(),
        reason: reason.to_owned(),
    };

    if key.is_empty() {
        return Err(invalid("key must not be empty"));
    }
    if key.contains('\0') {
        return Err(invalid("null bytes are not allowed"));
    }
    if key.contains('\\') || key.contains(':') {
        return Err(invalid("backslashes and drive prefixes are not allowed"));
    }
    if key.starts_with('/') {
        return Err(invalid("absolute keys are not allowed"));
    }
    for segment in key.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(invalid("empty, '.' and '..' segments are not allowed"));
        }
    }
    Ok(())
}

#[async_trait::async_trait]
impl StorageBackend for FileBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.resolve(key)?;
        let read_err = |e: std::io::Error| StorageError::Read {
            key: key.to_owned(),
            reason: e.to_string(),
        };

        let meta = match fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(read_err(e)),
        };
        if !meta.is_file() {
            return Ok(None);
        }

        self.ensure_contained(key, &path).await?;

        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(read_err(e)),
        }
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        self.prepare_parent(key, &path).await?;

        // An existing entry may be a symlink; follow it only if it stays inside.
        if fs::symlink_metadata(&path).await.is_ok() {
            self.ensure_contained(key, &path).await?;
        }

        fs::write(&path, value)
            .await
            .map_err(|e| StorageError::Write {
                key: key.to_owned(),
                reason: e.to_string(),
            })
    }

    async fn create(&self, key: &str, value: &[u8]) -> Result<bool, StorageError> {
        let path = self.resolve(key)?;
        self.prepare_parent(key, &path).await?;

        let write_err = |e: std::io::Error| StorageError::Write {
            key: key.to_owned(),
            reason: e.to_string(),
        };

        // `create_new` maps to O_EXCL, which also refuses dangling symlinks.
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(write_err(e)),
        };

        file.write_all(value).await.map_err(write_err)?;
        file.flush().await.map_err(write_err)?;
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        let delete_err = |e: std::io::Error| StorageError::Delete {
            key: key.to_owned(),
            reason: e.to_string(),
        };

        match fs::symlink_metadata(&path).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(delete_err(e)),
        }

        let parent = path.parent().unwrap_or(&self.root);
        self.ensure_contained(key, parent).await?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(delete_err(e)),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let list_err = |reason: String| StorageError::List {
            prefix: prefix.to_owned(),
            reason,
        };

        // Start the walk at the deepest directory named by the prefix.
        let dir_part = prefix.rfind('/').map_or("", |idx| &prefix[..idx]);
        let start = if dir_part.is_empty() {
            self.root.clone()
        } else {
            validate_key(dir_part)?;
            let start = self.root.join(dir_part);
            match fs::canonicalize(&start).await {
                Ok(real) if !real.starts_with(&self.root) => {
                    return Err(StorageError::OutsideRoot {
                        key: prefix.to_owned(),
                    });
                }
                Ok(_) => start,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(list_err(e.to_string())),
            }
        };

        let mut keys = Vec::new();
        let mut pending = vec![(start, dir_part.to_owned())];

        while let Some((dir, key_prefix)) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(list_err(e.to_string())),
            };

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| list_err(e.to_string()))?
            {
                let Ok(name) = entry.file_name().into_string() else {
                    warn!(dir = %dir.display(), "skipping non-UTF-8 file name");
                    continue;
                };
                let key = if key_prefix.is_empty() {
                    name
                } else {
                    format!("{key_prefix}/{name}")
                };

                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| list_err(e.to_string()))?;
                if file_type.is_dir() {
                    pending.push((entry.path(), key));
                } else if file_type.is_file() && key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.resolve(key)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Read {
                key: key.to_owned(),
                reason: e.to_string(),
            }),
        }
    }
}
