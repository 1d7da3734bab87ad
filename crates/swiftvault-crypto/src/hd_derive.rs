//! SLIP-0010 Ed25519 key derivation.
//!
//! Wallet keys live at the chain's standard account path
//! [`WALLET_DERIVATION_PATH`]. Ed25519 supports hardened children only,
//! so every path component must carry a `'` or `h` suffix.
//!
//! Reference: <https://github.com/satoshilabs/slips/blob/master/slip-0010.md>

use hmac::{Hmac, Mac};
use sha2::Sha512;
use swiftvault_types::{Result, SwiftvaultError};
use zeroize::Zeroizing;

use crate::mnemonic::{Mnemonic, Seed};
use crate::signing::Keypair;

type HmacSha512 = Hmac<Sha512>;

/// `m / purpose' / coin_type' / account' / change'` for coin type 501.
pub const WALLET_DERIVATION_PATH: &str = "m/44'/501'/0'/0'";

const HARDENED_OFFSET: u32 = 0x8000_0000;

/// HMAC key for master key generation (SLIP-0010 §2).
const MASTER_HMAC_KEY: &[u8] = b"ed25519 seed";

/// Private key and chain code of one derivation node, wiped on drop.
struct ExtendedKey {
    key: Zeroizing<[u8; 32]>,
    chain_code: Zeroizing<[u8; 32]>,
}

impl ExtendedKey {
    fn from_hmac_output(i: &[u8; 64]) -> Self {
        let mut key = Zeroizing::new([0u8; 32]);
        let mut chain_code = Zeroizing::new([0u8; 32]);
        key.copy_from_slice(&i[..32]);
        chain_code.copy_from_slice(&i[32..]);
        Self { key, chain_code }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Derives the wallet keypair from a validated mnemonic.
///
/// Pure function of the mnemonic: the same phrase always yields the
/// same keypair, which is what makes phrase recovery possible.
pub fn derive_keypair(mnemonic: &Mnemonic) -> Result<Keypair> {
    let seed = mnemonic.to_seed()?;
    derive_ed25519_keypair(&seed, WALLET_DERIVATION_PATH)
}

/// Derives an Ed25519 keypair from a BIP39 seed along `path`.
///
/// # Process
///
/// 1. Master node: `HMAC-SHA512(key="ed25519 seed", data=seed)`, left
///    half is the key, right half the chain code.
/// 2. For every index `i`:
///    `HMAC-SHA512(key=chain_code, data=0x00 ‖ key ‖ ser32(i | 2^31))`.
/// 3. The final 32-byte key is the Ed25519 secret.
///
/// # Errors
///
/// - [`SwiftvaultError::ConfigError`] for a malformed or non-hardened
///   path.
/// - [`SwiftvaultError::CryptoError`] if HMAC initialisation fails.
pub fn derive_ed25519_keypair(seed: &Seed, path: &str) -> Result<Keypair> {
    let indices = parse_derivation_path(path)?;

    let node = indices
        .iter()
        .try_fold(master_key_from_seed(seed.as_bytes())?, |parent, &index| {
            derive_hardened_child(&parent, index)
        })?;

    Ok(Keypair::from_seed(&node.key))
}

// ---------------------------------------------------------------------------
// Internal
// ---------------------------------------------------------------------------

fn master_key_from_seed(seed: &[u8]) -> Result<ExtendedKey> {
    let i = hmac_sha512(MASTER_HMAC_KEY, seed)?;
    Ok(ExtendedKey::from_hmac_output(&i))
}

fn derive_hardened_child(parent: &ExtendedKey, index: u32) -> Result<ExtendedKey> {
    let mut data = Zeroizing::new([0u8; 37]);
    data[1..33].copy_from_slice(parent.key.as_slice());
    data[33..].copy_from_slice(&(index | HARDENED_OFFSET).to_be_bytes());

    let i = hmac_sha512(parent.chain_code.as_slice(), data.as_slice())?;
    Ok(ExtendedKey::from_hmac_output(&i))
}

fn hmac_sha512(key: &[u8], data: &[u8]) -> Result<Zeroizing<[u8; 64]>> {
    let mut mac = HmacSha512::new_from_slice(key).map_err(|e| SwiftvaultError::CryptoError {
        reason: format!("HMAC-SHA512 key init failed: {e}"),
    })?;
    mac.update(data);

    let mut output = Zeroizing::new([0u8; 64]);
    output.copy_from_slice(&mac.finalize().into_bytes());
    Ok(output)
}

/// Parses `m/44'/501'/0'/0'` into raw indices (offset not applied).
fn parse_derivation_path(path: &str) -> Result<Vec<u32>> {
    let trimmed = path.trim();
    let components = trimmed
        .strip_prefix("m/")
        .ok_or_else(|| SwiftvaultError::ConfigError {
            reason: format!("derivation path must start with 'm/', got '{trimmed}'"),
        })?;

    if components.is_empty() {
        return Err(SwiftvaultError::ConfigError {
            reason: "derivation path must have at least one component".into(),
        });
    }

    components
        .split('/')
        .map(|part| {
            let num = part
                .strip_suffix('\'')
                .or_else(|| part.strip_suffix('h'))
                .ok_or_else(|| SwiftvaultError::ConfigError {
                    reason: format!("Ed25519 derivation is hardened-only, got '{part}'"),
                })?;

            let index: u32 = num.parse().map_err(|e| SwiftvaultError::ConfigError {
                reason: format!("invalid index '{num}' in path: {e}"),
            })?;

            if index >= HARDENED_OFFSET {
                return Err(SwiftvaultError::ConfigError {
                    reason: format!("index {index} exceeds {}", HARDENED_OFFSET - 1),
                });
            }
            Ok(index)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
