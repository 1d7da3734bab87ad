//! Recovery-phrase confirmation for newly created wallets.
//!
//! After creation the user must prove they wrote the phrase down by
//! typing the words at three random positions. The flow is a small
//! typestate machine:
//!
//! ```text
//! PendingWallet ──submit──▶ Verified(Keypair)
//!        │                  Retry(PendingWallet)
//!        └──────────────▶  Exhausted
//! ```
//!
//! [`PendingWallet::submit`] consumes the pending wallet, so a verified
//! challenge cannot be replayed and an exhausted one cannot be retried.
//! The phrase and the expected words are zeroized on drop.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use subtle::ConstantTimeEq;
use swiftvault_crypto::mnemonic::{Mnemonic, MNEMONIC_WORDS};
use swiftvault_crypto::random::random_array;
use swiftvault_crypto::signing::Keypair;
use swiftvault_types::{PublicKey, Result, SwiftvaultError};
use zeroize::Zeroizing;

/// Number of words the user is asked for.
pub const CHALLENGE_WORDS: usize = 3;

// ---------------------------------------------------------------------------
// RecoveryChallenge
// ---------------------------------------------------------------------------

/// Outcome of checking the entered words.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VerificationResult {
    /// Every word matched.
    Verified,
    /// At least one word was wrong or missing.
    Failed,
}

/// Three 1-based phrase positions and the words expected there.
pub struct RecoveryChallenge {
    public_key: PublicKey,
    positions: [usize; CHALLENGE_WORDS],
    expected: Zeroizing<Vec<String>>,
}

impl RecoveryChallenge {
    /// Picks three distinct positions uniformly from `1..=24`, in
    /// ascending order.
    ///
    /// # Errors
    ///
    /// [`SwiftvaultError::EntropySourceUnavailable`] if the OS generator
    /// fails.
    pub fn new(public_key: PublicKey, mnemonic: &Mnemonic) -> Result<Self> {
        let mut rng = StdRng::from_seed(random_array::<32>()?);
        let mut picked: Vec<usize> = sample(&mut rng, MNEMONIC_WORDS, CHALLENGE_WORDS)
            .into_iter()
            .map(|i| i + 1)
            .collect();
        picked.sort_unstable();

        let mut positions = [0usize; CHALLENGE_WORDS];
        positions.copy_from_slice(&picked);
        Self::with_positions(public_key, mnemonic, positions)
    }

    /// Builds a challenge for fixed positions, kept in the given order.
    ///
    /// # Errors
    ///
    /// [`SwiftvaultError::InvalidState`] if a position is outside
    /// `1..=24` or repeated.
    pub fn with_positions(
        public_key: PublicKey,
        mnemonic: &Mnemonic,
        positions: [usize; CHALLENGE_WORDS],
    ) -> Result<Self> {
        for (i, pos) in positions.iter().enumerate() {
            if positions[..i].contains(pos) {
                return Err(SwiftvaultError::InvalidState {
                    reason: format!("challenge position {pos} repeated"),
                });
            }
        }

        let mut expected = Zeroizing::new(Vec::with_capacity(CHALLENGE_WORDS));
        for &pos in &positions {
            let word = mnemonic.word_at(pos).ok_or_else(|| SwiftvaultError::InvalidState {
                reason: format!("challenge position {pos} outside 1..={}", mnemonic.word_count()),
            })?;
            expected.push(word.to_owned());
        }

        Ok(Self {
            public_key,
            positions,
            expected,
        })
    }

    /// Wallet the challenge belongs to.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// 1-based positions to ask for, in display order.
    pub fn positions(&self) -> [usize; CHALLENGE_WORDS] {
        self.positions
    }

    /// Compares `entered` with the expected words, one per position in
    /// [`positions`](Self::positions) order. Case and surrounding
    /// whitespace are ignored. Every word is compared in constant time
    /// and all three are always examined.
    pub fn verify(&self, entered: &[&str]) -> VerificationResult {
        if entered.len() != CHALLENGE_WORDS {
            return VerificationResult::Failed;
        }

        let matched = self
            .expected
            .iter()
            .zip(entered)
            .fold(subtle::Choice::from(1u8), |acc, (want, got)| {
                let got = Zeroizing::new(got.trim().to_lowercase());
                acc & want.as_bytes().ct_eq(got.as_bytes())
            });

        if bool::from(matched) {
            VerificationResult::Verified
        } else {
            VerificationResult::Failed
        }
    }
}

// ---------------------------------------------------------------------------
// PendingWallet
// ---------------------------------------------------------------------------

/// Result of one confirmation attempt.
pub enum Confirmation {
    /// Words matched; the wallet may be activated with this keypair.
    Verified(Keypair),
    /// Words did not match; attempts remain.
    Retry(PendingWallet),
    /// The last attempt failed. The wallet must be discarded.
    Exhausted,
}

/// A freshly created wallet whose phrase has not been confirmed.
pub struct PendingWallet {
    mnemonic: Mnemonic,
    keypair: Keypair,
    challenge: RecoveryChallenge,
    attempts_left: u32,
}

impl PendingWallet {
    /// Bundles a new wallet with its challenge. `max_attempts` of zero
    /// is treated as one.
    ///
    /// # Errors
    ///
    /// [`SwiftvaultError::InvalidState`] if the challenge was built for
    /// another public key.
    pub fn new(
        mnemonic: Mnemonic,
        keypair: Keypair,
        challenge: RecoveryChallenge,
        max_attempts: u32,
    ) -> Result<Self> {
        if challenge.public_key() != &keypair.public_key() {
            return Err(SwiftvaultError::InvalidState {
                reason: "challenge does not belong to this wallet".into(),
            });
        }
        Ok(Self {
            mnemonic,
            keypair,
            challenge,
            attempts_left: max_attempts.max(1),
        })
    }

    /// Public key of the pending wallet.
    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    /// The recovery phrase, for the user to write down.
    pub fn phrase(&self) -> &str {
        self.mnemonic.as_str()
    }

    /// Positions the user will be asked for.
    pub fn positions(&self) -> [usize; CHALLENGE_WORDS] {
        self.challenge.positions()
    }

    /// Attempts remaining before the wallet is discarded.
    pub fn attempts_left(&self) -> u32 {
        self.attempts_left
    }

    /// Checks one answer, consuming the pending wallet.
    pub fn submit(mut self, entered: &[&str]) -> Confirmation {
        match self.challenge.verify(entered) {
            VerificationResult::Verified => Confirmation::Verified(self.keypair),
            VerificationResult::Failed => {
                self.attempts_left -= 1;
                if self.attempts_left == 0 {
                    Confirmation::Exhausted
                } else {
                    Confirmation::Retry(self)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swiftvault_crypto::hd_derive::derive_keypair;
    use swiftvault_crypto::mnemonic::entropy_to_mnemonic;

    fn fixture() -> std::result::Result<(Mnemonic, Keypair), SwiftvaultError> {
        let mnemonic = entropy_to_mnemonic(&[0u8; 32])?;
        let keypair = derive_keypair(&mnemonic)?;
        Ok((mnemonic, keypair))
    }

    #[test]
    fn random_positions_are_sorted_distinct_and_in_range() -> std::result::Result<(), SwiftvaultError> {
        let (mnemonic, keypair) = fixture()?;
        for _ in 0..50 {
            let challenge = RecoveryChallenge::new(keypair.public_key(), &mnemonic)?;
            let p = challenge.positions();
            assert!(p[0] < p[1] && p[1] < p[2], "{p:?}");
            assert!(p.iter().all(|&i| (1..=24).contains(&i)));
        }
        Ok(())
    }

    #[test]
    fn verify_ignores_case_and_whitespace() -> std::result::Result<(), SwiftvaultError> {
        let (mnemonic, keypair) = fixture()?;
        // all-zero entropy: "abandon" × 23, then "art"
        let challenge = RecoveryChallenge::with_positions(keypair.public_key(), &mnemonic, [24, 1, 2])?;
        assert_eq!(challenge.verify(&[" ART", "abandon", "Abandon "]), VerificationResult::Verified);
        assert_eq!(challenge.verify(&["abandon", "abandon", "art"]), VerificationResult::Failed);
        assert_eq!(challenge.verify(&["art", "abandon"]), VerificationResult::Failed);
        Ok(())
    }

    #[test]
    fn with_positions_rejects_bad_positions() -> std::result::Result<(), SwiftvaultError> {
        let (mnemonic, keypair) = fixture()?;
        for bad in [[0, 1, 2], [1, 2, 25], [3, 3, 4]] {
            assert!(matches!(
                RecoveryChallenge::with_positions(keypair.public_key(), &mnemonic, bad),
                Err(SwiftvaultError::InvalidState { .. })
            ));
        }
        Ok(())
    }

    #[test]
    fn pending_wallet_exhausts_after_max_attempts() -> std::result::Result<(), SwiftvaultError> {
        let (mnemonic, keypair) = fixture()?;
        let challenge = RecoveryChallenge::with_positions(keypair.public_key(), &mnemonic, [1, 2, 3])?;
        let mut pending = PendingWallet::new(mnemonic, keypair, challenge, 3)?;

        for left in [2, 1] {
            pending = match pending.submit(&["zoo", "zoo", "zoo"]) {
                Confirmation::Retry(p) => p,
                _ => panic!("expected retry"),
            };
            assert_eq!(pending.attempts_left(), left);
        }
        assert!(matches!(pending.submit(&["zoo", "zoo", "zoo"]), Confirmation::Exhausted));
        Ok(())
    }

    #[test]
    fn pending_wallet_releases_keypair_on_success() -> std::result::Result<(), SwiftvaultError> {
        let (mnemonic, keypair) = fixture()?;
        let expected = keypair.public_key();
        let challenge = RecoveryChallenge::with_positions(expected, &mnemonic, [1, 12, 24])?;
        let pending = PendingWallet::new(mnemonic, keypair, challenge, 3)?;

        match pending.submit(&["abandon", "abandon", "art"]) {
            Confirmation::Verified(kp) => assert_eq!(kp.public_key(), expected),
            _ => panic!("expected verified"),
        }
        Ok(())
    }
}
