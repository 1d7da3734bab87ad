//! SHA-256 hashing and the salted recovery-phrase digest.

use sha2::{Digest, Sha256};

/// Length of the per-wallet phrase salt.
pub const PHRASE_SALT_LEN: usize = 16;

/// Computes the SHA-256 hash of arbitrary data.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Computes `SHA-256(salt ‖ phrase)`.
///
/// `phrase` must already be normalised (lower-case words joined by
/// single spaces) so every spelling of the same phrase hashes alike.
/// Lets a record be found from its phrase without storing the phrase.
pub fn phrase_hash(salt: &[u8], phrase: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(phrase.as_bytes());
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// FIPS 180-2 test vector: "abc".
    #[test]
    fn sha256_abc() {
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn sha256_empty() {
        assert_eq!(
            hex::encode(sha256(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn phrase_hash_is_plain_sha256_of_concatenation() {
        let salt = [0x01u8; PHRASE_SALT_LEN];
        let mut joined = salt.to_vec();
        joined.extend_from_slice(b"abandon art");
        assert_eq!(phrase_hash(&salt, "abandon art"), sha256(&joined));
    }

    #[test]
    fn salt_changes_digest() {
        let a = phrase_hash(&[0x01; PHRASE_SALT_LEN], "abandon art");
        let b = phrase_hash(&[0x02; PHRASE_SALT_LEN], "abandon art");
        assert_ne!(a, b);
    }
}
