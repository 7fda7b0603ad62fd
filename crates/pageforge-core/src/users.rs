//! Encrypted user store.
//!
//! All users live in a single JSON object keyed by username, encrypted with
//! AES-256-GCM and stored at [`USERS_KEY`]:
//!
//! ```json
//! { "admin": { "password": "$argon2id$...", "role": "admin" } }
//! ```
//!
//! The encryption key is derived from the request host plus a fixed secret
//! (see [`crypto::derive_store_key`]). Loading is deliberately forgiving:
//!
//! - no file yet → a single default `admin` account (password `password`)
//! - unreadable, undecryptable, or unparseable file → an empty user set
//!
//! Neither case is reported by [`UserStore::load`]; both are logged.
//! [`UserStore::add_user`] refuses to write over a file it cannot read.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use pageforge_storage::StorageBackend;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::crypto;
use crate::error::{PasswordError, UserStoreError};
use crate::password;

/// Storage key of the encrypted user map.
pub const USERS_KEY: &str = "users.json";

/// Username of the account returned when no user file exists yet.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// Password of the default account.
const DEFAULT_ADMIN_PASSWORD: &str = "password";

/// What a user may do in the admin area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access, including user management.
    Admin,
    /// Pages, stylesheets and templates only.
    Editor,
}

impl Role {
    /// The lowercase wire name of the role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Editor => "editor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "editor" => Ok(Self::Editor),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// A persisted user entry. The username is the map key.
#[derive(Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Argon2 PHC hash of the password.
    #[serde(rename = "password")]
    pub password_hash: String,
    /// The user's role.
    pub role: Role,
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("password_hash", &"[REDACTED]")
            .field("role", &self.role)
            .finish()
    }
}

/// The full set of users, ordered by username.
pub type UserMap = BTreeMap<String, UserRecord>;

/// A user whose password has just been verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub username: String,
    pub role: Role,
}

/// Loads, saves, and queries the encrypted user map.
pub struct UserStore {
    storage: Arc<dyn StorageBackend>,
    secret: String,
}

impl fmt::Debug for UserStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserStore").finish_non_exhaustive()
    }
}

impl UserStore {
    /// Create a user store over `storage`, mixing `secret` into the key.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>, secret: impl Into<String>) -> Self {
        Self {
            storage,
            secret: secret.into(),
        }
    }

    /// Load the user map as seen from `host`.
    ///
    /// Never fails: a missing file yields the default admin account and any
    /// other problem yields an empty map.
    pub async fn load(&self, host: &str) -> UserMap {
        match self.read(host).await {
            StoredUsers::Missing => default_users().await,
            StoredUsers::Loaded(users) => users,
            StoredUsers::Unreadable(reason) => {
                warn!(error = %reason, "user store unreadable, treating as empty");
                UserMap::new()
            }
        }
    }

    /// Read the user file without papering over failures.
    async fn read(&self, host: &str) -> StoredUsers {
        let ciphertext = match self.storage.get(USERS_KEY).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return StoredUsers::Missing,
            Err(e) => return StoredUsers::Unreadable(format!("read failed: {e}")),
        };

        let plaintext = match crypto::derive_store_key(host, &self.secret)
            .and_then(|key| crypto::decrypt(&key, &ciphertext))
        {
            Ok(plaintext) => plaintext,
            Err(e) => return StoredUsers::Unreadable(format!("decrypt failed: {e}")),
        };

        match serde_json::from_slice(&plaintext) {
            Ok(users) => StoredUsers::Loaded(users),
            Err(e) => StoredUsers::Unreadable(format!("parse failed: {e}")),
        }
    }

    /// Serialize, encrypt, and persist the user map for `host`.
    ///
    /// # Errors
    ///
    /// Returns [`UserStoreError::Serialization`], [`UserStoreError::Crypto`],
    /// or [`UserStoreError::Storage`] if any step fails.
    pub async fn save(&self, host: &str, users: &UserMap) -> Result<(), UserStoreError> {
        let plaintext = serde_json::to_vec(users).map_err(|e| UserStoreError::Serialization {
            reason: e.to_string(),
        })?;
        let key = crypto::derive_store_key(host, &self.secret)?;
        let ciphertext = crypto::encrypt(&key, &plaintext)?;
        self.storage.put(USERS_KEY, &ciphertext).await?;
        Ok(())
    }

    /// Check a username/password pair.
    ///
    /// Returns `None` for an unknown user and for a wrong password alike. An
    /// unknown user still costs one hash verification so the two cases take
    /// comparable time.
    pub async fn authenticate(
        &self,
        host: &str,
        username: &str,
        password: &str,
    ) -> Option<AuthenticatedUser> {
        let users = self.load(host).await;
        let record = users.get(username);

        let hash = record.map(|record| record.password_hash.clone());
        let password = password.to_owned();
        // First use of the dummy hash runs Argon2.
        let verified = tokio::task::spawn_blocking(move || {
            let hash: &str = match hash.as_deref() {
                Some(hash) => hash,
                None => timing_dummy_hash(),
            };
            password::verify_password(&password, hash)
        })
        .await
        .unwrap_or(false);

        match record {
            Some(record) if verified => Some(AuthenticatedUser {
                username: username.to_owned(),
                role: record.role,
            }),
            _ => None,
        }
    }

    /// Add a new user with a freshly hashed password.
    ///
    /// # Errors
    ///
    /// Returns [`UserStoreError::Duplicate`] if the username is taken,
    /// [`UserStoreError::Unreadable`] if an existing user file cannot be read
    /// as seen from `host` (it is left untouched), or any error from hashing
    /// or [`save`](UserStore::save).
    pub async fn add_user(
        &self,
        host: &str,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<(), UserStoreError> {
        let mut users = match self.read(host).await {
            StoredUsers::Missing => default_users().await,
            StoredUsers::Loaded(users) => users,
            StoredUsers::Unreadable(reason) => {
                warn!(username, error = %reason, "refusing to add user over an unreadable user store");
                return Err(UserStoreError::Unreadable { reason });
            }
        };
        if users.contains_key(username) {
            return Err(UserStoreError::Duplicate {
                username: username.to_owned(),
            });
        }

        let password_hash = hash_blocking(password).await?;
        users.insert(username.to_owned(), UserRecord { password_hash, role });
        self.save(host, &users).await?;

        info!(username, role = %role, "user added");
        Ok(())
    }
}

/// Outcome of reading the user file.
enum StoredUsers {
    Missing,
    Loaded(UserMap),
    Unreadable(String),
}

/// The account set used before any user file has been written.
async fn default_users() -> UserMap {
    let mut users = UserMap::new();
    match hash_blocking(DEFAULT_ADMIN_PASSWORD).await {
        Ok(password_hash) => {
            users.insert(
                DEFAULT_ADMIN_USERNAME.to_owned(),
                UserRecord {
                    password_hash,
                    role: Role::Admin,
                },
            );
        }
        Err(e) => warn!(error = %e, "failed to hash default admin password"),
    }
    users
}

/// Hash on the blocking pool; Argon2 is deliberately slow.
async fn hash_blocking(password: &str) -> Result<String, PasswordError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || password::hash_password(&password))
        .await
        .map_err(|e| PasswordError::Hash {
            reason: format!("hashing task failed: {e}"),
        })?
}

/// A valid hash of nothing in particular, verified against for unknown users.
fn timing_dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| password::hash_password("pageforge-timing-dummy").unwrap_or_default())
}
