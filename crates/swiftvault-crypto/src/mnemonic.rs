//! BIP39 mnemonic generation, validation, and seed derivation.
//!
//! Swiftvault uses 24-word (256-bit entropy) mnemonics only:
//!
//! 1. **Generation**: 256-bit entropy → SHA-256 checksum (8 bits) →
//!    264 bits split into 24 × 11-bit indices → 24 BIP39 words.
//! 2. **Validation**: normalise (whitespace split, lower-case), check
//!    the word count and wordlist membership, rebuild the entropy and
//!    verify the checksum.
//! 3. **Seed derivation**: PBKDF2-HMAC-SHA512 with 2048 rounds,
//!    salt = `"mnemonic" + passphrase`, producing a 64-byte seed.
//!
//! Reference: <https://github.com/bitcoin/bips/blob/master/bip-0039.mediawiki>

use hmac::Hmac;
use sha2::{Digest, Sha256, Sha512};
use swiftvault_types::{Result, SwiftvaultError};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::random::fill_random;
use crate::wordlist::{index_to_word, word_to_index};

/// Number of words in every Swiftvault mnemonic.
pub const MNEMONIC_WORDS: usize = 24;

/// Entropy length in bytes for a 24-word mnemonic.
pub const ENTROPY_LEN: usize = 32;

/// PBKDF2 rounds fixed by BIP39.
const SEED_ROUNDS: u32 = 2048;

// ---------------------------------------------------------------------------
// Mnemonic
// ---------------------------------------------------------------------------

/// A validated 24-word BIP39 mnemonic in normalised form (lower-case,
/// single spaces).
///
/// The inner string is zeroized on drop. Only [`generate_mnemonic`],
/// [`entropy_to_mnemonic`] and [`Mnemonic::parse`] construct one, so a
/// value of this type always carries a valid checksum.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Mnemonic(String);

impl Mnemonic {
    /// Normalises and validates user input.
    ///
    /// # Errors
    ///
    /// [`SwiftvaultError::InvalidMnemonic`] if the word count, a word,
    /// or the checksum is wrong. Invalid input is rejected, never
    /// coerced.
    pub fn parse(phrase: &str) -> Result<Self> {
        validate_mnemonic(phrase)?;
        Ok(Self(normalize_phrase(phrase)))
    }

    /// Returns the mnemonic phrase as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the individual words in order.
    pub fn words(&self) -> Vec<&str> {
        self.0.split(' ').collect()
    }

    /// Returns the word at a 1-based position, as shown to users.
    pub fn word_at(&self, position: usize) -> Option<&str> {
        position
            .checked_sub(1)
            .and_then(|i| self.0.split(' ').nth(i))
    }

    /// Returns the number of words in the mnemonic.
    pub fn word_count(&self) -> usize {
        self.0.split(' ').count()
    }

    /// Derives the BIP39 seed with an empty passphrase.
    pub fn to_seed(&self) -> Result<Seed> {
        mnemonic_to_seed(&self.0, "")
    }
}

// Mnemonic does not implement Clone/Debug to prevent leakage.

/// Lower-cases the phrase and collapses any whitespace run to one space.
pub fn normalize_phrase(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Seed
// ---------------------------------------------------------------------------

/// A 64-byte seed derived from a BIP39 mnemonic via PBKDF2-HMAC-SHA512.
///
/// Input to SLIP-0010 derivation. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Seed([u8; 64]);

impl Seed {
    /// Fixed byte length of a BIP39 seed.
    pub const LEN: usize = 64;

    /// Creates a [`Seed`] from a raw 64-byte array (test vectors).
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Returns the raw 64-byte seed.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Generates a new random 24-word BIP39 mnemonic.
///
/// # Process
///
/// 1. Read 256 bits of entropy from the OS CSPRNG.
/// 2. Encode with [`entropy_to_mnemonic`].
/// 3. Wipe the entropy buffer.
///
/// # Errors
///
/// [`SwiftvaultError::EntropySourceUnavailable`] if the OS generator
/// cannot be read. Never retried with a weaker source.
pub fn generate_mnemonic() -> Result<Mnemonic> {
    let mut entropy = [0u8; ENTROPY_LEN];
    fill_random(&mut entropy)?;

    let result = entropy_to_mnemonic(&entropy);

    entropy.zeroize();
    result
}

/// Converts raw 256-bit entropy into a 24-word BIP39 mnemonic.
///
/// Deterministic core of generation, exposed for known test vectors.
pub fn entropy_to_mnemonic(entropy: &[u8; ENTROPY_LEN]) -> Result<Mnemonic> {
    let checksum = Sha256::digest(entropy)[0];

    // 256 entropy bits followed by 8 checksum bits.
    let mut bits = Vec::with_capacity(264);
    for byte in entropy.iter().chain(std::iter::once(&checksum)) {
        for j in (0..8).rev() {
            bits.push((byte >> j) & 1);
        }
    }

    let mut words = Vec::with_capacity(MNEMONIC_WORDS);
    for chunk in bits.chunks(11) {
        let idx = chunk
            .iter()
            .fold(0u16, |acc, bit| (acc << 1) | u16::from(*bit));

        let word = index_to_word(idx).ok_or_else(|| SwiftvaultError::CryptoError {
            reason: format!("BIP39 word index {idx} out of range"),
        })?;
        words.push(word);
    }
    bits.zeroize();

    Ok(Mnemonic(words.join(" ")))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validates a BIP39 mnemonic phrase.
///
/// Input is normalised first, so mixed case and extra whitespace are
/// accepted.
///
/// # Checks performed
///
/// 1. Exactly 24 words.
/// 2. Every word exists in the BIP39 English wordlist.
/// 3. Reconstruct entropy from the 11-bit indices.
/// 4. Recompute `SHA-256(entropy)` and verify the 8-bit checksum.
///
/// # Errors
///
/// [`SwiftvaultError::InvalidMnemonic`] naming the failed check. The
/// offending word is identified by position only.
pub fn validate_mnemonic(phrase: &str) -> Result<()> {
    let normalised = Zeroizing::new(normalize_phrase(phrase));
    let words: Vec<&str> = normalised.split_whitespace().collect();

    if words.len() != MNEMONIC_WORDS {
        return Err(SwiftvaultError::InvalidMnemonic {
            reason: format!(
                "expected {MNEMONIC_WORDS} words, got {}",
                words.len()
            ),
        });
    }

    let mut bits = Vec::with_capacity(264);
    for (i, word) in words.iter().enumerate() {
        let idx = word_to_index(word).ok_or_else(|| SwiftvaultError::InvalidMnemonic {
            reason: format!("word {} is not in the BIP39 wordlist", i + 1),
        })?;
        for j in (0..11).rev() {
            bits.push(((idx >> j) & 1) as u8);
        }
    }

    let mut entropy = [0u8; ENTROPY_LEN];
    for (i, bit) in bits[..256].iter().enumerate() {
        if *bit == 1 {
            entropy[i / 8] |= 1 << (7 - (i % 8));
        }
    }

    let provided_checksum = bits[256..]
        .iter()
        .fold(0u8, |acc, bit| (acc << 1) | bit);
    let expected_checksum = Sha256::digest(entropy)[0];

    entropy.zeroize();
    bits.zeroize();

    if provided_checksum != expected_checksum {
        return Err(SwiftvaultError::InvalidMnemonic {
            reason: "checksum mismatch".into(),
        });
    }

    Ok(())
}

/// Boolean form of [`validate_mnemonic`].
pub fn is_valid_mnemonic(phrase: &str) -> bool {
    validate_mnemonic(phrase).is_ok()
}

// ---------------------------------------------------------------------------
// Seed derivation
// ---------------------------------------------------------------------------

/// Derives a 64-byte seed from a BIP39 mnemonic and optional passphrase.
///
/// - **Password**: the mnemonic sentence (the English list is ASCII,
///   so NFKD normalisation is a no-op).
/// - **Salt**: `"mnemonic"` concatenated with `passphrase`.
/// - **Algorithm**: PBKDF2-HMAC-SHA512, 2048 rounds, 64-byte output.
///
/// The wallet always uses an empty passphrase; the parameter exists
/// for the published test vectors.
pub fn mnemonic_to_seed(mnemonic: &str, passphrase: &str) -> Result<Seed> {
    let mut salt = Vec::with_capacity(8 + passphrase.len());
    salt.extend_from_slice(b"mnemonic");
    salt.extend_from_slice(passphrase.as_bytes());

    let mut output = [0u8; Seed::LEN];
    let derived =
        pbkdf2::pbkdf2::<Hmac<Sha512>>(mnemonic.as_bytes(), &salt, SEED_ROUNDS, &mut output)
            .map_err(|e| SwiftvaultError::CryptoError {
                reason: format!("PBKDF2-HMAC-SHA512 failed: {e}"),
            });

    salt.zeroize();
    if let Err(e) = derived {
        output.zeroize();
        return Err(e);
    }

    Ok(Seed(output))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wordlist::wordlist;

    const ZERO_PHRASE: &str = "abandon abandon abandon abandon abandon abandon \
                               abandon abandon abandon abandon abandon abandon \
                               abandon abandon abandon abandon abandon abandon \
                               abandon abandon abandon abandon abandon art";

    #[test]
    fn generate_produces_24_words() -> std::result::Result<(), SwiftvaultError> {
        let mnemonic = generate_mnemonic()?;
        assert_eq!(mnemonic.word_count(), 24);
        Ok(())
    }

    #[test]
    fn generated_mnemonic_validates() -> std::result::Result<(), SwiftvaultError> {
        let mnemonic = generate_mnemonic()?;
        validate_mnemonic(mnemonic.as_str())?;
        Ok(())
    }

    #[test]
    fn generated_mnemonics_differ() -> std::result::Result<(), SwiftvaultError> {
        let a = generate_mnemonic()?;
        let b = generate_mnemonic()?;
        assert_ne!(a.as_str(), b.as_str());
        Ok(())
    }

    #[test]
    fn all_words_in_wordlist() -> std::result::Result<(), SwiftvaultError> {
        let mnemonic = generate_mnemonic()?;
        for word in mnemonic.words() {
            assert!(
                wordlist().binary_search(&word).is_ok(),
                "word '{word}' not in BIP39 wordlist"
            );
        }
        Ok(())
    }

    #[test]
    fn entropy_all_zeros() -> std::result::Result<(), SwiftvaultError> {
        let mnemonic = entropy_to_mnemonic(&[0x00; 32])?;
        let words = mnemonic.words();
        assert!(words[..23].iter().all(|w| *w == "abandon"));
        assert_eq!(words[23], "art");
        Ok(())
    }

    #[test]
    fn entropy_all_ff() -> std::result::Result<(), SwiftvaultError> {
        let mnemonic = entropy_to_mnemonic(&[0xFF; 32])?;
        let words = mnemonic.words();
        assert!(words[..23].iter().all(|w| *w == "zoo"));
        assert_eq!(words[23], "vote");
        Ok(())
    }

    #[test]
    fn word_at_is_one_based() -> std::result::Result<(), SwiftvaultError> {
        let mnemonic = entropy_to_mnemonic(&[0x00; 32])?;
        assert_eq!(mnemonic.word_at(1), Some("abandon"));
        assert_eq!(mnemonic.word_at(24), Some("art"));
        assert_eq!(mnemonic.word_at(0), None);
        assert_eq!(mnemonic.word_at(25), None);
        Ok(())
    }

    #[test]
    fn parse_normalises_case_and_whitespace() -> std::result::Result<(), SwiftvaultError> {
        let messy = format!("  {}\n", ZERO_PHRASE.to_uppercase().replace(' ', "\t "));
        let mnemonic = Mnemonic::parse(&messy)?;
        assert_eq!(mnemonic.as_str(), normalize_phrase(ZERO_PHRASE));
        Ok(())
    }

    #[test]
    fn validate_rejects_wrong_word_count() {
        let result = validate_mnemonic("abandon abandon abandon");
        assert!(matches!(result, Err(SwiftvaultError::InvalidMnemonic { .. })));
    }

    #[test]
    fn validate_rejects_twelve_words() {
        let twelve = "abandon abandon abandon abandon abandon abandon \
                      abandon abandon abandon abandon abandon about";
        assert!(!is_valid_mnemonic(twelve));
    }

    #[test]
    fn validate_rejects_invalid_word() {
        let mut words = vec!["abandon"; 24];
        words[5] = "notaword";
        let result = validate_mnemonic(&words.join(" "));
        match result {
            Err(SwiftvaultError::InvalidMnemonic { reason }) => {
                assert!(reason.contains("word 6"));
                assert!(!reason.contains("notaword"));
            }
            other => panic!("expected InvalidMnemonic, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_bad_checksum() {
        let phrase = vec!["abandon"; 24].join(" ");
        assert!(matches!(
            validate_mnemonic(&phrase),
            Err(SwiftvaultError::InvalidMnemonic { .. })
        ));
    }

    #[test]
    fn seed_with_passphrase_differs() -> std::result::Result<(), SwiftvaultError> {
        let plain = mnemonic_to_seed(ZERO_PHRASE, "")?;
        let with_pass = mnemonic_to_seed(ZERO_PHRASE, "TREZOR")?;
        assert_ne!(plain.as_bytes(), with_pass.as_bytes());
        Ok(())
    }

    #[test]
    fn to_seed_uses_empty_passphrase() -> std::result::Result<(), SwiftvaultError> {
        let mnemonic = Mnemonic::parse(ZERO_PHRASE)?;
        let direct = mnemonic_to_seed(mnemonic.as_str(), "")?;
        assert_eq!(mnemonic.to_seed()?.as_bytes(), direct.as_bytes());
        Ok(())
    }
}
