//! PIN-sealed storage of the wallet's private key.
//!
//! The 64-byte keypair (secret seed ‖ public key) is encrypted with
//! XChaCha20-Poly1305 under a key stretched from the PIN by
//! PBKDF2-HMAC-SHA256. The AAD binds the ciphertext to this format and
//! to the owning public key, so an entry copied under another
//! identity fails authentication.
//!
//! Structural damage (wrong field lengths, iteration count below the
//! floor) is reported as [`SwiftvaultError::VaultCorrupted`] before any
//! key derivation runs. A failed authentication tag is always
//! [`SwiftvaultError::IncorrectPin`]: a wrong PIN and a tampered
//! ciphertext are not distinguishable and are not reported apart.

use serde::{Deserialize, Serialize};
use swiftvault_crypto::aead::{
    decrypt_xchacha20, encrypt_xchacha20, generate_aead_nonce, AeadNonce, TAG_LEN,
};
use swiftvault_crypto::kdf::{pbkdf2_sha256_derive_key, MIN_ITERATIONS, SALT_LEN};
use swiftvault_crypto::random::random_array;
use swiftvault_crypto::signing::{keypair_matches, Keypair, KEYPAIR_LEN};
use swiftvault_types::{PublicKey, Result, SwiftvaultError};
use zeroize::Zeroizing;

use crate::pin::Pin;
use crate::serde_hex;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Domain prefix of the AEAD associated data.
pub(crate) const VAULT_AAD_PREFIX: &[u8] = b"swiftvault-vault-v1";

/// Expected ciphertext length: sealed keypair plus tag.
pub const CIPHERTEXT_LEN: usize = KEYPAIR_LEN + TAG_LEN;

// ---------------------------------------------------------------------------
// EncryptedVaultEntry
// ---------------------------------------------------------------------------

/// Persisted, encrypted form of one wallet's private key.
///
/// Contains no secret in the clear. Byte fields are hex strings on
/// disk; their lengths are validated on unlock, not on parse, so a
/// damaged entry still loads and reports `VaultCorrupted`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedVaultEntry {
    /// Identity the entry belongs to.
    pub public_key: PublicKey,
    /// Sealed keypair with the Poly1305 tag appended.
    #[serde(with = "serde_hex::bytes")]
    pub ciphertext: Vec<u8>,
    /// 24-byte XChaCha20 nonce.
    #[serde(with = "serde_hex::bytes")]
    pub iv: Vec<u8>,
    /// 32-byte PBKDF2 salt.
    #[serde(with = "serde_hex::bytes")]
    pub kdf_salt: Vec<u8>,
    /// PBKDF2 iteration count used when sealing.
    pub kdf_iterations: u32,
}

impl EncryptedVaultEntry {
    /// Checks field lengths and the iteration floor.
    ///
    /// # Errors
    ///
    /// [`SwiftvaultError::VaultCorrupted`] naming the first bad field.
    pub fn check_structure(&self) -> Result<()> {
        let corrupted = |reason: String| Err(SwiftvaultError::VaultCorrupted { reason });

        if self.iv.len() != AeadNonce::LEN {
            return corrupted(format!("iv must be {} bytes, got {}", AeadNonce::LEN, self.iv.len()));
        }
        if self.kdf_salt.len() != SALT_LEN {
            return corrupted(format!(
                "kdf salt must be {SALT_LEN} bytes, got {}",
                self.kdf_salt.len()
            ));
        }
        if self.ciphertext.len() != CIPHERTEXT_LEN {
            return corrupted(format!(
                "ciphertext must be {CIPHERTEXT_LEN} bytes, got {}",
                self.ciphertext.len()
            ));
        }
        if self.kdf_iterations < MIN_ITERATIONS {
            return corrupted(format!(
                "kdf iterations {} below minimum {MIN_ITERATIONS}",
                self.kdf_iterations
            ));
        }
        Ok(())
    }
}

fn vault_aad(public_key: &PublicKey) -> Vec<u8> {
    let mut aad = Vec::with_capacity(VAULT_AAD_PREFIX.len() + PublicKey::LEN);
    aad.extend_from_slice(VAULT_AAD_PREFIX);
    aad.extend_from_slice(public_key.as_bytes());
    aad
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Seals a raw 64-byte keypair under `pin`.
///
/// Process:
/// 1. Check `private_key` is a 64-byte keypair whose public half is
///    `public_key`.
/// 2. Draw a fresh 32-byte salt and 24-byte nonce.
/// 3. Derive the vault key with PBKDF2-HMAC-SHA256(pin, salt, iterations).
/// 4. Encrypt with AAD `"swiftvault-vault-v1" ‖ public_key`.
///
/// Slow by construction; run it off the async executor.
///
/// # Errors
///
/// - [`SwiftvaultError::MalformedKeyMaterial`] if the key material is
///   the wrong length or belongs to another public key.
/// - [`SwiftvaultError::EntropySourceUnavailable`] if salt or nonce
///   cannot be drawn.
/// - [`SwiftvaultError::ConfigError`] if `iterations` is below the floor.
pub fn lock_private_key(
    public_key: &PublicKey,
    private_key: &[u8],
    pin: &Pin,
    iterations: u32,
) -> Result<EncryptedVaultEntry> {
    let keypair_bytes: &[u8; KEYPAIR_LEN] =
        private_key
            .try_into()
            .map_err(|_| SwiftvaultError::MalformedKeyMaterial {
                reason: format!("private key must be {KEYPAIR_LEN} bytes, got {}", private_key.len()),
            })?;
    if !keypair_matches(keypair_bytes, public_key) {
        return Err(SwiftvaultError::MalformedKeyMaterial {
            reason: "private key does not belong to the given public key".into(),
        });
    }

    let salt: [u8; SALT_LEN] = random_array()?;
    let nonce = generate_aead_nonce()?;
    let key = pbkdf2_sha256_derive_key(pin.as_bytes(), &salt, iterations)?;
    let ciphertext =
        encrypt_xchacha20(key.as_bytes(), &nonce, keypair_bytes, &vault_aad(public_key))?;

    Ok(EncryptedVaultEntry {
        public_key: *public_key,
        ciphertext,
        iv: nonce.as_bytes().to_vec(),
        kdf_salt: salt.to_vec(),
        kdf_iterations: iterations,
    })
}

/// Opens an entry with `pin`, returning the raw 64-byte keypair.
///
/// Process:
/// 1. Validate the entry structure.
/// 2. Re-derive the vault key from the stored salt and iteration count.
/// 3. Decrypt and authenticate.
/// 4. Check the plaintext is a consistent keypair for the entry's
///    public key.
///
/// # Errors
///
/// - [`SwiftvaultError::VaultCorrupted`] on structural damage, or if an
///   authenticated plaintext does not match the entry's public key.
/// - [`SwiftvaultError::IncorrectPin`] if authentication fails.
pub fn unlock_private_key(entry: &EncryptedVaultEntry, pin: &Pin) -> Result<Zeroizing<Vec<u8>>> {
    entry.check_structure()?;

    let mut iv = [0u8; AeadNonce::LEN];
    iv.copy_from_slice(&entry.iv);
    let nonce = AeadNonce::from_bytes(iv);

    let key = pbkdf2_sha256_derive_key(pin.as_bytes(), &entry.kdf_salt, entry.kdf_iterations)?;
    let plaintext = Zeroizing::new(
        decrypt_xchacha20(key.as_bytes(), &nonce, &entry.ciphertext, &vault_aad(&entry.public_key))
            .map_err(|_| SwiftvaultError::IncorrectPin)?,
    );

    let consistent = <&[u8; KEYPAIR_LEN]>::try_from(plaintext.as_slice())
        .map(|bytes| keypair_matches(bytes, &entry.public_key))
        .unwrap_or(false);
    if !consistent {
        return Err(SwiftvaultError::VaultCorrupted {
            reason: "decrypted key does not match the stored public key".into(),
        });
    }

    Ok(plaintext)
}

// ---------------------------------------------------------------------------
// Vault
// ---------------------------------------------------------------------------

/// Keypair-level front end to [`lock_private_key`] and
/// [`unlock_private_key`] with a fixed iteration count for new entries.
#[derive(Clone, Copy, Debug)]
pub struct Vault {
    iterations: u32,
}

impl Vault {
    /// Creates a vault sealing new entries with `iterations` rounds.
    ///
    /// # Errors
    ///
    /// [`SwiftvaultError::ConfigError`] if `iterations` is below the floor.
    pub fn new(iterations: u32) -> Result<Self> {
        if iterations < MIN_ITERATIONS {
            return Err(SwiftvaultError::ConfigError {
                reason: format!("vault iterations must be at least {MIN_ITERATIONS}, got {iterations}"),
            });
        }
        Ok(Self { iterations })
    }

    /// Iteration count applied to newly sealed entries.
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Seals `keypair` under `pin`.
    pub fn lock(&self, keypair: &Keypair, pin: &Pin) -> Result<EncryptedVaultEntry> {
        let bytes = keypair.to_keypair_bytes();
        lock_private_key(&keypair.public_key(), bytes.as_slice(), pin, self.iterations)
    }

    /// Opens `entry` and rebuilds its keypair. Entries sealed with a
    /// different iteration count still open; the count is per entry.
    pub fn unlock(&self, entry: &EncryptedVaultEntry, pin: &Pin) -> Result<Keypair> {
        let plaintext = unlock_private_key(entry, pin)?;
        let mut bytes = Zeroizing::new([0u8; KEYPAIR_LEN]);
        bytes.copy_from_slice(&plaintext);
        Keypair::from_keypair_bytes(&bytes).map_err(|e| SwiftvaultError::VaultCorrupted {
            reason: format!("decrypted key unusable: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_keypair() -> Keypair {
        Keypair::from_seed(&[0x24; 32])
    }

    #[test]
    fn lock_rejects_short_key_material() -> std::result::Result<(), SwiftvaultError> {
        let kp = test_keypair();
        let pin = Pin::parse("1234")?;
        let result = lock_private_key(&kp.public_key(), &[0u8; 32], &pin, MIN_ITERATIONS);
        assert!(matches!(result, Err(SwiftvaultError::MalformedKeyMaterial { .. })));
        Ok(())
    }

    #[test]
    fn lock_rejects_foreign_public_key() -> std::result::Result<(), SwiftvaultError> {
        let kp = test_keypair();
        let other = Keypair::from_seed(&[0x25; 32]).public_key();
        let pin = Pin::parse("1234")?;
        let bytes = kp.to_keypair_bytes();
        let result = lock_private_key(&other, bytes.as_slice(), &pin, MIN_ITERATIONS);
        assert!(matches!(result, Err(SwiftvaultError::MalformedKeyMaterial { .. })));
        Ok(())
    }

    #[test]
    fn vault_refuses_weak_iteration_count() {
        assert!(matches!(
            Vault::new(MIN_ITERATIONS - 1),
            Err(SwiftvaultError::ConfigError { .. })
        ));
    }

    #[test]
    fn entry_fields_have_expected_sizes() -> std::result::Result<(), SwiftvaultError> {
        let vault = Vault::new(MIN_ITERATIONS)?;
        let entry = vault.lock(&test_keypair(), &Pin::parse("1234")?)?;
        assert_eq!(entry.iv.len(), 24);
        assert_eq!(entry.kdf_salt.len(), 32);
        assert_eq!(entry.ciphertext.len(), 80);
        assert_eq!(entry.kdf_iterations, MIN_ITERATIONS);
        entry.check_structure()
    }

    #[test]
    fn low_iteration_entry_is_corrupted_not_opened() -> std::result::Result<(), SwiftvaultError> {
        let vault = Vault::new(MIN_ITERATIONS)?;
        let mut entry = vault.lock(&test_keypair(), &Pin::parse("1234")?)?;
        entry.kdf_iterations = 1_000;
        assert!(matches!(
            vault.unlock(&entry, &Pin::parse("1234")?),
            Err(SwiftvaultError::VaultCorrupted { .. })
        ));
        Ok(())
    }
}
