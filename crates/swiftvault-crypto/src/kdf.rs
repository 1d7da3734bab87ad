//! PIN stretching with PBKDF2-HMAC-SHA256.
//!
//! Derives the 256-bit vault key from a PIN and a per-entry salt. The
//! iteration count is a parameter so each entry can record the cost it
//! was sealed with; [`MIN_ITERATIONS`] is a hard floor.

use hmac::Hmac;
use sha2::Sha256;
use swiftvault_types::config::MIN_KDF_ITERATIONS;
use swiftvault_types::{Result, SwiftvaultError};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Lowest iteration count accepted for derivation.
pub const MIN_ITERATIONS: u32 = MIN_KDF_ITERATIONS;

/// Salt length used for vault entries.
pub const SALT_LEN: usize = 32;

/// Shortest salt accepted (NIST SP 800-132 asks for at least 128 bits).
const MIN_SALT_LEN: usize = 16;

// ---------------------------------------------------------------------------
// DerivedKey
// ---------------------------------------------------------------------------

/// 256-bit symmetric key derived from a PIN.
///
/// Zeroized on drop. Never stored.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; 32]);

impl DerivedKey {
    /// Fixed byte length of the derived key.
    pub const LEN: usize = 32;

    /// Returns the raw 32-byte key material.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

// DerivedKey does not implement Clone/Debug to prevent leakage.

// ---------------------------------------------------------------------------
// Key derivation
// ---------------------------------------------------------------------------

/// Derives a 256-bit key from `secret` and `salt`.
///
/// CPU-bound and deliberately slow: callers on an async runtime should
/// run it on a blocking thread.
///
/// # Errors
///
/// - [`SwiftvaultError::ConfigError`] if `iterations` is below
///   [`MIN_ITERATIONS`] or the salt is shorter than 16 bytes.
/// - [`SwiftvaultError::CryptoError`] if PBKDF2 itself fails.
pub fn pbkdf2_sha256_derive_key(
    secret: &[u8],
    salt: &[u8],
    iterations: u32,
) -> Result<DerivedKey> {
    if iterations < MIN_ITERATIONS {
        return Err(SwiftvaultError::ConfigError {
            reason: format!("PBKDF2 iterations must be at least {MIN_ITERATIONS}, got {iterations}"),
        });
    }
    if salt.len() < MIN_SALT_LEN {
        return Err(SwiftvaultError::ConfigError {
            reason: format!(
                "salt must be at least {MIN_SALT_LEN} bytes, got {}",
                salt.len()
            ),
        });
    }

    let mut key = DerivedKey([0u8; DerivedKey::LEN]);
    pbkdf2::pbkdf2::<Hmac<Sha256>>(secret, salt, iterations, &mut key.0).map_err(|e| {
        SwiftvaultError::CryptoError {
            reason: format!("PBKDF2-HMAC-SHA256 failed: {e}"),
        }
    })?;

    Ok(key)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const SALT: &[u8] = b"0123456789abcdef0123456789abcdef";

    #[test]
    fn derive_key_is_deterministic() -> std::result::Result<(), SwiftvaultError> {
        let a = pbkdf2_sha256_derive_key(b"1234", SALT, MIN_ITERATIONS)?;
        let b = pbkdf2_sha256_derive_key(b"1234", SALT, MIN_ITERATIONS)?;
        assert_eq!(a.as_bytes(), b.as_bytes());
        Ok(())
    }

    #[test]
    fn different_pin_different_key() -> std::result::Result<(), SwiftvaultError> {
        let a = pbkdf2_sha256_derive_key(b"1234", SALT, MIN_ITERATIONS)?;
        let b = pbkdf2_sha256_derive_key(b"1235", SALT, MIN_ITERATIONS)?;
        assert_ne!(a.as_bytes(), b.as_bytes());
        Ok(())
    }

    #[test]
    fn different_salt_different_key() -> std::result::Result<(), SwiftvaultError> {
        let a = pbkdf2_sha256_derive_key(b"1234", SALT, MIN_ITERATIONS)?;
        let b = pbkdf2_sha256_derive_key(b"1234", &[0x5A; 32], MIN_ITERATIONS)?;
        assert_ne!(a.as_bytes(), b.as_bytes());
        Ok(())
    }

    #[test]
    fn different_iterations_different_key() -> std::result::Result<(), SwiftvaultError> {
        let a = pbkdf2_sha256_derive_key(b"1234", SALT, MIN_ITERATIONS)?;
        let b = pbkdf2_sha256_derive_key(b"1234", SALT, MIN_ITERATIONS + 1)?;
        assert_ne!(a.as_bytes(), b.as_bytes());
        Ok(())
    }

    #[test]
    fn low_iterations_rejected() {
        let result = pbkdf2_sha256_derive_key(b"1234", SALT, MIN_ITERATIONS - 1);
        assert!(matches!(result, Err(SwiftvaultError::ConfigError { .. })));
    }

    #[test]
    fn short_salt_rejected() {
        let result = pbkdf2_sha256_derive_key(b"1234", b"short", MIN_ITERATIONS);
        assert!(matches!(result, Err(SwiftvaultError::ConfigError { .. })));
    }
}
