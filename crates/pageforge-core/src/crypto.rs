//! Cryptographic primitives for `PageForge`.
//!
//! Provides AES-256-GCM authenticated encryption for the user store, the
//! HKDF-SHA256 derivation of the store key, and random tokens for session
//! identifiers and CSRF tokens.
//!
//! # Security model
//!
//! - Every encryption generates a fresh 96-bit nonce via `OsRng`.
//! - Ciphertext format: `nonce (12 bytes) || ciphertext || tag (16 bytes)`.
//! - The store key is derived from the request host and a fixed secret, so
//!   the same data directory served under another host name cannot be read.
//! - Key types derive `Zeroize` + `ZeroizeOnDrop`.

use std::fmt;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use hkdf::Hkdf;
use rand::RngCore;
use rand::rngs::OsRng as TokenRng;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// Minimum ciphertext length: 12-byte nonce + 16-byte AES-GCM tag.
const MIN_CIPHERTEXT_LEN: usize = 12 + 16;

/// Nonce length for AES-256-GCM (96 bits).
const NONCE_LEN: usize = 12;

/// HKDF salt for the user store key.
const STORE_KEY_SALT: &[u8] = b"pageforge-user-store";

/// HKDF info for the user store key.
const STORE_KEY_INFO: &[u8] = b"pageforge-users-v1";

/// Number of random bytes in session ids and CSRF tokens.
const TOKEN_BYTES: usize = 32;

/// A 256-bit encryption key that is zeroized on drop.
///
/// The inner bytes are never exposed in `Debug` output.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    /// Create a key from raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Borrow the raw key bytes.
    ///
    /// Use with care: the caller must not log or persist these bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Encrypt plaintext using AES-256-GCM with a fresh random nonce.
///
/// Returns `nonce (12 bytes) || ciphertext || tag (16 bytes)`.
///
/// # Errors
///
/// Returns [`CryptoError::Encryption`] if the AEAD operation fails.
pub fn encrypt(key: &EncryptionKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| CryptoError::Encryption {
            reason: e.to_string(),
        })?;

    let mut combined = Vec::with_capacity(NONCE_LEN.saturating_add(ciphertext.len()));
    combined.extend_from_slice(&nonce);
    combined.extend_from_slice(&ciphertext);
    Ok(combined)
}

/// Decrypt ciphertext produced by [`encrypt`].
///
/// # Errors
///
/// Returns [`CryptoError::CiphertextTooShort`] if the input is shorter than
/// 28 bytes, and [`CryptoError::Decryption`] if authentication fails (wrong
/// key, corrupted data, or tampered tag).
pub fn decrypt(key: &EncryptionKey, combined: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if combined.len() < MIN_CIPHERTEXT_LEN {
        return Err(CryptoError::CiphertextTooShort {
            expected: MIN_CIPHERTEXT_LEN,
            actual: combined.len(),
        });
    }

    let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| CryptoError::Decryption {
            reason: e.to_string(),
        })
}

/// Derive the user store key from the host name and a fixed secret string.
///
/// The host is lowercased first; `Example.com` and `example.com` share a key.
///
/// # Errors
///
/// Returns [`CryptoError::KeyDerivation`] if HKDF expansion fails.
pub fn derive_store_key(host: &str, secret: &str) -> Result<EncryptionKey, CryptoError> {
    let mut ikm = host.to_ascii_lowercase().into_bytes();
    ikm.extend_from_slice(secret.as_bytes());

    let hk = Hkdf::<Sha256>::new(Some(STORE_KEY_SALT), &ikm);
    ikm.zeroize();

    let mut derived = [0u8; 32];
    hk.expand(STORE_KEY_INFO, &mut derived)
        .map_err(|e| CryptoError::KeyDerivation {
            context: String::from_utf8_lossy(STORE_KEY_INFO).into_owned(),
            reason: e.to_string(),
        })?;
    Ok(EncryptionKey::from_bytes(derived))
}

/// Generate a hex-encoded random token (64 hex chars) from the OS CSPRNG.
///
/// Used for session identifiers and CSRF tokens.
#[must_use]
pub fn random_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    TokenRng.fill_bytes(&mut bytes);
    let token = hex::encode(bytes);
    bytes.zeroize();
    token
}
