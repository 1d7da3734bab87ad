//! XChaCha20-Poly1305 authenticated encryption.
//!
//! Nonces are 192 bits, drawn fresh from the OS for every encryption,
//! so random generation is safe without a counter.

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use swiftvault_types::{Result, SwiftvaultError};

use crate::random::fill_random;

/// Poly1305 tag length appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// 192-bit nonce for XChaCha20-Poly1305. Stored as the vault `iv`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AeadNonce([u8; 24]);

impl AeadNonce {
    /// Fixed byte length of an XChaCha20-Poly1305 nonce.
    pub const LEN: usize = 24;

    /// Creates an [`AeadNonce`] from raw bytes.
    pub fn from_bytes(bytes: [u8; 24]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying 24-byte array.
    pub fn as_bytes(&self) -> &[u8; 24] {
        &self.0
    }
}

/// Draws a fresh nonce from the OS CSPRNG.
///
/// # Errors
///
/// [`SwiftvaultError::EntropySourceUnavailable`] if the OS generator
/// fails.
pub fn generate_aead_nonce() -> Result<AeadNonce> {
    let mut bytes = [0u8; AeadNonce::LEN];
    fill_random(&mut bytes)?;
    Ok(AeadNonce(bytes))
}

/// Encrypts `plaintext`, returning ciphertext with the tag appended
/// (`plaintext.len() + 16` bytes).
pub fn encrypt_xchacha20(
    key: &[u8; 32],
    nonce: &AeadNonce,
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .encrypt(XNonce::from_slice(&nonce.0), Payload { msg: plaintext, aad })
        .map_err(|e| SwiftvaultError::CryptoError {
            reason: format!("XChaCha20-Poly1305 encryption failed: {e}"),
        })
}

/// Decrypts and authenticates `ciphertext`.
///
/// # Errors
///
/// [`SwiftvaultError::CryptoError`] on tag failure. The cause (wrong
/// key, wrong nonce, wrong AAD, tampering) is not distinguishable.
pub fn decrypt_xchacha20(
    key: &[u8; 32],
    nonce: &AeadNonce,
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .decrypt(XNonce::from_slice(&nonce.0), Payload { msg: ciphertext, aad })
        .map_err(|_| SwiftvaultError::CryptoError {
            reason: "XChaCha20-Poly1305 authentication failed".into(),
        })
}
