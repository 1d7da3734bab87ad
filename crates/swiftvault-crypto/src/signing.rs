//! Ed25519 signing keypair.
//!
//! The [`Keypair`] is the transient in-memory form of the private key.
//! It never persists itself; the vault encrypts its 64-byte encoding.
//! The secret scalar is zeroized on drop by `ed25519-dalek`.

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use swiftvault_types::{PublicKey, Result, SwiftvaultError};
use zeroize::Zeroizing;

/// Length of the secret half of a keypair.
pub const SECRET_KEY_LEN: usize = 32;

/// Length of the `secret ‖ public` keypair encoding.
pub const KEYPAIR_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// Ed25519 signature (64 bytes).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Signature([u8; 64]);

impl Signature {
    /// Fixed byte length of an Ed25519 signature.
    pub const LEN: usize = 64;

    /// Creates a [`Signature`] from raw bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying 64-byte array.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Base-58 form, the chain's transaction id format.
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

// ---------------------------------------------------------------------------
// Keypair
// ---------------------------------------------------------------------------

/// Ed25519 signing keypair.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Reconstructs a keypair deterministically from a 32-byte secret.
    pub fn from_seed(seed: &[u8; SECRET_KEY_LEN]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Parses the 64-byte `secret ‖ public` encoding.
    ///
    /// # Errors
    ///
    /// [`SwiftvaultError::MalformedKeyMaterial`] if the public half is
    /// not the one derived from the secret half.
    pub fn from_keypair_bytes(bytes: &[u8; KEYPAIR_LEN]) -> Result<Self> {
        let signing_key = SigningKey::from_keypair_bytes(bytes).map_err(|_| {
            SwiftvaultError::MalformedKeyMaterial {
                reason: "public half does not match secret half".into(),
            }
        })?;
        Ok(Self { signing_key })
    }

    /// Imports a raw private key from hex.
    ///
    /// Accepts an optional `0x` prefix and surrounding whitespace, then
    /// either 128 hex digits (64-byte keypair) or 64 hex digits
    /// (32-byte secret).
    ///
    /// # Errors
    ///
    /// [`SwiftvaultError::MalformedKeyMaterial`] for non-hex characters,
    /// any other byte length, or an inconsistent 64-byte keypair.
    pub fn from_hex(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        let bytes = Zeroizing::new(hex::decode(digits).map_err(|e| {
            SwiftvaultError::MalformedKeyMaterial {
                reason: format!("not valid hex: {e}"),
            }
        })?);

        match bytes.len() {
            KEYPAIR_LEN => {
                let mut arr = Zeroizing::new([0u8; KEYPAIR_LEN]);
                arr.copy_from_slice(&bytes);
                Self::from_keypair_bytes(&arr)
            }
            SECRET_KEY_LEN => {
                let mut arr = Zeroizing::new([0u8; SECRET_KEY_LEN]);
                arr.copy_from_slice(&bytes);
                Ok(Self::from_seed(&arr))
            }
            n => Err(SwiftvaultError::MalformedKeyMaterial {
                reason: format!(
                    "expected {SECRET_KEY_LEN} or {KEYPAIR_LEN} bytes, got {n}"
                ),
            }),
        }
    }

    /// Returns the public half of this keypair.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_bytes(self.signing_key.verifying_key().to_bytes())
    }

    /// Signs `message`. Ed25519 is deterministic (RFC 8032).
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key.sign(message).to_bytes())
    }

    /// Returns the 64-byte `secret ‖ public` encoding in a wiping buffer.
    pub fn to_keypair_bytes(&self) -> Zeroizing<[u8; KEYPAIR_LEN]> {
        Zeroizing::new(self.signing_key.to_keypair_bytes())
    }

    /// Hex of the 64-byte encoding, for explicit export only.
    pub fn to_hex(&self) -> Zeroizing<String> {
        let bytes = self.to_keypair_bytes();
        Zeroizing::new(hex::encode(bytes.as_slice()))
    }
}

// Keypair intentionally does not implement Clone or Debug.

/// Checks that a raw 64-byte keypair encodes `expected` and is
/// internally consistent, wiping the parsed copy afterwards.
pub fn keypair_matches(bytes: &[u8; KEYPAIR_LEN], expected: &PublicKey) -> bool {
    match Keypair::from_keypair_bytes(bytes) {
        Ok(kp) => kp.public_key() == *expected,
        Err(_) => false,
    }
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Verifies an Ed25519 signature against a public key and message.
///
/// # Errors
///
/// [`SwiftvaultError::CryptoError`] if the key is not a valid curve
/// point or the signature does not verify.
pub fn verify(public_key: &PublicKey, message: &[u8], signature: &Signature) -> Result<()> {
    let vk = VerifyingKey::from_bytes(public_key.as_bytes()).map_err(|e| {
        SwiftvaultError::CryptoError {
            reason: format!("invalid public key: {e}"),
        }
    })?;
    let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    vk.verify_strict(message, &sig)
        .map_err(|e| SwiftvaultError::CryptoError {
            reason: format!("signature verification failed: {e}"),
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
