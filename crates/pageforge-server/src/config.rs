//! Server configuration for `PageForge`.
//!
//! Loads configuration from environment variables with sensible defaults.
//! All settings can be overridden via `PAGEFORGE_*` environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8080;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Storage backend type.
    pub storage_backend: StorageBackendType,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
    /// Fixed string mixed into the user store key.
    pub store_secret: String,
    /// Host name used for key derivation instead of the request's `Host`.
    pub store_host: Option<String>,
    /// Idle lifetime of a login session.
    pub session_ttl: Duration,
    /// How often expired sessions are swept.
    pub session_sweep_interval: Duration,
    /// Whether the session cookie carries the `Secure` attribute.
    pub secure_cookies: bool,
    /// Request body limit for the admin form.
    pub max_upload_bytes: usize,
}

/// Supported storage backend types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackendType {
    /// In-memory (development only, data lost on restart).
    Memory,
    /// One file per key under a data directory.
    File { path: PathBuf },
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PORT` — port to bind on (binds to `0.0.0.0`)
    /// - `PAGEFORGE_BIND_ADDR` — full bind address (overrides `PORT`, default: `127.0.0.1:8080`)
    /// - `PAGEFORGE_STORAGE` — `file` or `memory` (default: `file`)
    /// - `PAGEFORGE_DATA_DIR` — root for the file backend (default: `./data`)
    /// - `PAGEFORGE_LOG_LEVEL` — log filter (default: `info`)
    /// - `PAGEFORGE_STORE_SECRET` — user store key material (default: `secure_cms_key`)
    /// - `PAGEFORGE_STORE_HOST` — pin the key derivation host (default: request `Host`)
    /// - `PAGEFORGE_SESSION_TTL` — idle session lifetime in seconds (default: `3600`)
    /// - `PAGEFORGE_SESSION_SWEEP_INTERVAL` — seconds between sweeps (default: `60`)
    /// - `PAGEFORGE_SECURE_COOKIES` — `Secure` cookie attribute (default: `true`)
    /// - `PAGEFORGE_MAX_UPLOAD_BYTES` — admin request body limit (default: `2097152`)
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default_addr = SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT));

        // Priority: PAGEFORGE_BIND_ADDR > PORT > default 127.0.0.1:8080
        let bind_addr = if let Some(addr) = lookup("PAGEFORGE_BIND_ADDR") {
            addr.parse().unwrap_or(default_addr)
        } else if let Some(port_str) = lookup("PORT") {
            let port: u16 = port_str.parse().unwrap_or(DEFAULT_PORT);
            SocketAddr::from(([0, 0, 0, 0], port))
        } else {
            default_addr
        };

        let data_dir = lookup("PAGEFORGE_DATA_DIR").unwrap_or_else(|| "./data".to_owned());

        let storage_backend = match lookup("PAGEFORGE_STORAGE")
            .unwrap_or_else(|| "file".to_owned())
            .to_lowercase()
            .as_str()
        {
            "memory" => StorageBackendType::Memory,
            _ => StorageBackendType::File {
                path: PathBuf::from(data_dir),
            },
        };

        let log_level = lookup("PAGEFORGE_LOG_LEVEL").unwrap_or_else(|| "info".to_owned());

        let store_secret =
            lookup("PAGEFORGE_STORE_SECRET").unwrap_or_else(|| "secure_cms_key".to_owned());

        let store_host = lookup("PAGEFORGE_STORE_HOST")
            .map(|h| h.trim().to_owned())
            .filter(|h| !h.is_empty());

        let secs = |name: &str, default: u64| {
            Duration::from_secs(lookup(name).and_then(|v| v.parse().ok()).unwrap_or(default))
        };
        let session_ttl = secs("PAGEFORGE_SESSION_TTL", 3600);
        let session_sweep_interval = secs("PAGEFORGE_SESSION_SWEEP_INTERVAL", 60).max(Duration::from_secs(1));

        let secure_cookies = lookup("PAGEFORGE_SECURE_COOKIES")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let max_upload_bytes = lookup("PAGEFORGE_MAX_UPLOAD_BYTES")
            .and_then(|v| v.parse().ok())
            .unwrap_or(2 * 1024 * 1024);

        Self {
            bind_addr,
            storage_backend,
            log_level,
            store_secret,
            store_host,
            session_ttl,
            session_sweep_interval,
            secure_cookies,
            max_upload_bytes,
        }
    }
}
