//! Error types for `pageforge-core`.
//!
//! Each error variant carries enough context to diagnose the problem from a
//! log line. None of them ever include passwords, hashes, or key material.
//!
//! What the operator sees is a different matter: every domain error exposes a
//! `user_message()` with the plain inline string the admin form renders.
//! Security failures (traversal attempts, CSRF mismatches) and storage
//! failures deliberately collapse into generic wording there.

use pageforge_storage::StorageError;

/// Generic inline message for storage failures.
const STORAGE_FAILURE: &str = "Something went wrong while saving. Please try again.";

/// Errors from cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// AES-256-GCM encryption failed.
    #[error("encryption failed: {reason}")]
    Encryption { reason: String },

    /// AES-256-GCM decryption failed (wrong key, corrupted ciphertext, or tampered tag).
    #[error("decryption failed: {reason}")]
    Decryption { reason: String },

    /// HKDF key derivation failed.
    #[error("key derivation failed for context '{context}': {reason}")]
    KeyDerivation { context: String, reason: String },

    /// Ciphertext is too short to contain a valid nonce + tag.
    #[error("ciphertext too short: expected at least {expected} bytes, got {actual}")]
    CiphertextTooShort { expected: usize, actual: usize },
}

/// Errors from password hashing.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Argon2 refused to hash the password.
    #[error("password hashing failed: {reason}")]
    Hash { reason: String },
}

/// Errors from the encrypted user store.
#[derive(Debug, thiserror::Error)]
pub enum UserStoreError {
    /// The username is already taken.
    #[error("user already exists: {username}")]
    Duplicate { username: String },

    /// An existing user file could not be read, decrypted, or parsed.
    #[error("user store unreadable: {reason}")]
    Unreadable { reason: String },

    /// Serializing the user map failed.
    #[error("user store serialization failed: {reason}")]
    Serialization { reason: String },

    /// Encrypting the user map failed.
    #[error("user store crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Hashing the new user's password failed.
    #[error("user store password error: {0}")]
    Password(#[from] PasswordError),

    /// The storage backend returned an error.
    #[error("user store storage error: {0}")]
    Storage(#[from] StorageError),
}

impl UserStoreError {
    /// The inline message shown on the admin form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Duplicate { .. } => "That username is already taken.".to_owned(),
            Self::Unreadable { .. }
            | Self::Serialization { .. }
            | Self::Crypto(_)
            | Self::Password(_)
            | Self::Storage(_) => STORAGE_FAILURE.to_owned(),
        }
    }
}

/// Errors from page operations.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    /// The title reduces to an empty file name.
    #[error("title '{title}' contains no letters or digits")]
    EmptyFilename { title: String },

    /// The name belongs to the directory sentinel.
    #[error("page name is reserved: {name}")]
    Reserved { name: String },

    /// A page with the derived file name already exists.
    #[error("page already exists: {filename}")]
    AlreadyExists { filename: String },

    /// No page with that file name exists.
    #[error("page not found: {filename}")]
    NotFound { filename: String },

    /// The submitted name does not resolve inside the pages directory.
    #[error("page name escapes the pages directory: {name:?}")]
    OutsideDirectory { name: String },

    /// The selected stylesheet has not been uploaded.
    #[error("stylesheet not found: {name}")]
    StylesheetMissing { name: String },

    /// The storage backend returned an error.
    #[error("page storage error: {0}")]
    Storage(#[from] StorageError),
}

impl PageError {
    /// The inline message shown on the admin form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyFilename { .. } => {
                "The title must contain at least one letter or digit.".to_owned()
            }
            Self::Reserved { .. } => "That page name is reserved.".to_owned(),
            Self::AlreadyExists { filename } => {
                format!("A page named {filename} already exists.")
            }
            Self::NotFound { .. } => "Page not found.".to_owned(),
            Self::OutsideDirectory { .. } | Self::Storage(StorageError::OutsideRoot { .. }) => {
                "Invalid page name.".to_owned()
            }
            Self::StylesheetMissing { .. } => "The selected stylesheet does not exist.".to_owned(),
            Self::Storage(_) => STORAGE_FAILURE.to_owned(),
        }
    }
}

/// Errors from stylesheet uploads.
#[derive(Debug, thiserror::Error)]
pub enum StylesheetError {
    /// No file (or an empty file) was uploaded.
    #[error("no stylesheet uploaded")]
    Empty,

    /// The file extension is not `css`.
    #[error("invalid stylesheet extension: {filename}")]
    InvalidExtension { filename: String },

    /// The file is at or above the size limit.
    #[error("stylesheet too large: {size} bytes (limit {limit})")]
    TooLarge { size: usize, limit: usize },

    /// Nothing usable is left of the file name after sanitizing.
    #[error("invalid stylesheet name: {filename:?}")]
    InvalidName { filename: String },

    /// A stylesheet with the sanitized name already exists.
    #[error("stylesheet already exists: {filename}")]
    AlreadyExists { filename: String },

    /// The storage backend returned an error.
    #[error("stylesheet storage error: {0}")]
    Storage(#[from] StorageError),
}

impl StylesheetError {
    /// The inline message shown on the admin form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Empty => "Please choose a CSS file to upload.".to_owned(),
            Self::InvalidExtension { .. } => "Only .css files can be uploaded.".to_owned(),
            Self::TooLarge { .. } => "The stylesheet must be smaller than 1 MB.".to_owned(),
            Self::InvalidName { .. } => "Invalid stylesheet file name.".to_owned(),
            Self::AlreadyExists { filename } => {
                format!("A stylesheet named {filename} already exists.")
            }
            Self::Storage(_) => STORAGE_FAILURE.to_owned(),
        }
    }
}

/// Errors from the shared header/footer templates.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// The header or the footer was empty.
    #[error("header and footer must both be non-empty")]
    Empty,

    /// The storage backend returned an error.
    #[error("layout storage error: {0}")]
    Storage(#[from] StorageError),
}

impl LayoutError {
    /// The inline message shown on the admin form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Empty => "Header and footer cannot be empty.".to_owned(),
            Self::Storage(_) => STORAGE_FAILURE.to_owned(),
        }
    }
}

/// Errors from turning a submitted admin form into a command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// A required field was missing or blank.
    #[error("missing field: {field}")]
    MissingField { field: &'static str },

    /// A field was present but not acceptable.
    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// None of the known action fields was submitted.
    #[error("no recognised admin action in form")]
    UnknownAction,
}

impl CommandError {
    /// The inline message shown on the admin form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingField { field } => match *field {
                "title" => "Please enter a title.".to_owned(),
                "content" => "Please enter some content.".to_owned(),
                "css_choice" => "Please select a stylesheet.".to_owned(),
                "delete_page" => "Please select a page to delete.".to_owned(),
                "css_file" => "Please choose a CSS file to upload.".to_owned(),
                "header" | "footer" => "Header and footer cannot be empty.".to_owned(),
                "username" => "Please enter a username.".to_owned(),
                "password" => "Please enter a password.".to_owned(),
                other => format!("Please fill in the {other} field."),
            },
            Self::InvalidField { reason, .. } => reason.clone(),
            Self::UnknownAction => "Unknown action.".to_owned(),
        }
    }
}
