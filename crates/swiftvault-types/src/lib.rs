//! Core shared types for the Swiftvault wallet.
//!
//! This crate defines all fundamental types used across the workspace.
//! No other crate should define shared types; everything lives here.

pub mod config;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// PublicKey
// ---------------------------------------------------------------------------

/// Ed25519 public key (32 bytes), the wallet's durable external identity.
///
/// Displayed and serialized as a base-58 string, the form users copy
/// into "send to" fields and QR codes.
#[derive(Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    /// Fixed byte length of an Ed25519 public key.
    pub const LEN: usize = 32;

    /// Creates a [`PublicKey`] from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying 32-byte array.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the base-58 display form.
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl From<[u8; 32]> for PublicKey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_base58())
    }
}

impl FromStr for PublicKey {
    type Err = SwiftvaultError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let bytes = bs58::decode(s.trim())
            .into_vec()
            .map_err(|e| SwiftvaultError::InvalidAddress {
                reason: format!("invalid base58 encoding: {e}"),
            })?;
        if bytes.len() != Self::LEN {
            return Err(SwiftvaultError::InvalidAddress {
                reason: format!("expected 32 bytes, got {}", bytes.len()),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl Serialize for PublicKey {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// Cluster the wallet talks to. Remembered across sessions together
/// with the public key.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Network {
    /// Production cluster.
    #[serde(rename = "mainnet-beta")]
    Mainnet,
    /// Development cluster with faucet funds.
    #[default]
    #[serde(rename = "devnet")]
    Devnet,
    /// Validator test cluster.
    #[serde(rename = "testnet")]
    Testnet,
}

impl Network {
    /// Public JSON-RPC endpoint used when no override is configured.
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Self::Mainnet => "https://api.mainnet-beta.solana.com",
            Self::Devnet => "https://api.devnet.solana.com",
            Self::Testnet => "https://api.testnet.solana.com",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mainnet => write!(f, "mainnet-beta"),
            Self::Devnet => write!(f, "devnet"),
            Self::Testnet => write!(f, "testnet"),
        }
    }
}

impl FromStr for Network {
    type Err = SwiftvaultError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "mainnet-beta" => Ok(Self::Mainnet),
            "devnet" => Ok(Self::Devnet),
            "testnet" => Ok(Self::Testnet),
            other => Err(SwiftvaultError::ConfigError {
                reason: format!("unknown network '{other}'"),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Timestamp
// ---------------------------------------------------------------------------

/// UTC timestamp in ISO 8601 format.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a `Timestamp` representing the current UTC time.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a `Timestamp` from a `DateTime<Utc>`.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Returns the timestamp as an ISO 8601 string.
    pub fn as_str(&self) -> String {
        self.0.to_rfc3339()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl FromStr for Timestamp {
    type Err = SwiftvaultError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| SwiftvaultError::ConfigError {
                reason: format!("invalid ISO 8601 timestamp: {e}"),
            })?
            .with_timezone(&Utc);
        Ok(Self(dt))
    }
}

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// Coarse view of the session state machine, safe to hand to a UI.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum SessionStatus {
    /// No vault entry exists on this device.
    NoWallet,
    /// A wallet was created but its recovery phrase is not confirmed yet.
    AwaitingConfirmation,
    /// A vault entry exists; no decrypted key is in memory.
    Locked,
    /// A decrypted keypair is available for signing.
    Active,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoWallet => write!(f, "no-wallet"),
            Self::AwaitingConfirmation => write!(f, "awaiting-confirmation"),
            Self::Locked => write!(f, "locked"),
            Self::Active => write!(f, "active"),
        }
    }
}

// ---------------------------------------------------------------------------
// SwiftvaultError
// ---------------------------------------------------------------------------

/// Central error type for the Swiftvault wallet.
///
/// All crates in the workspace convert their internal errors into variants
/// of this enum, ensuring a unified error handling surface.
#[derive(Debug, Error)]
pub enum SwiftvaultError {
    /// The platform CSPRNG could not be read. Fatal to wallet creation.
    #[error("secure random source unavailable: {reason}")]
    EntropySourceUnavailable {
        /// Description of the RNG failure.
        reason: String,
    },

    /// Word count, wordlist membership, or checksum validation failed.
    #[error("invalid mnemonic: {reason}")]
    InvalidMnemonic {
        /// Which check failed.
        reason: String,
    },

    /// Imported key material has the wrong length or encoding.
    #[error("malformed key material: {reason}")]
    MalformedKeyMaterial {
        /// Description of the format problem.
        reason: String,
    },

    /// Vault decryption failed.
    ///
    /// Deliberately carries no detail: a wrong PIN and a tampered
    /// ciphertext produce the same error.
    #[error("incorrect PIN")]
    IncorrectPin,

    /// The PIN does not satisfy the strength policy.
    #[error("PIN rejected: {reason}")]
    WeakPin {
        /// Which policy rule was violated.
        reason: String,
    },

    /// Too many consecutive PIN failures; unlock is refused until the
    /// cool-down expires.
    #[error("too many failed PIN attempts; retry in {retry_after_secs}s")]
    LockedOut {
        /// Seconds remaining in the cool-down.
        retry_after_secs: u64,
    },

    /// The entered recovery words did not match. Never says which word.
    #[error("recovery phrase verification failed")]
    PhraseVerificationFailed,

    /// A stored vault entry is structurally invalid or decrypts to key
    /// material that does not match its public key.
    #[error("vault entry corrupted: {reason}")]
    VaultCorrupted {
        /// Description of the inconsistency.
        reason: String,
    },

    /// A signing operation was attempted without an active session.
    #[error("wallet is locked; unlock with your PIN first")]
    WalletLocked,

    /// An operation was invoked in a session state that does not allow it.
    #[error("invalid session state: {reason}")]
    InvalidState {
        /// Current state and attempted operation.
        reason: String,
    },

    /// No vault entry exists for the requested identity.
    #[error("wallet not found: {reason}")]
    WalletNotFound {
        /// Identity that was looked up.
        reason: String,
    },

    /// A cryptographic primitive failed for reasons other than the above.
    #[error("crypto error: {reason}")]
    CryptoError {
        /// Human-readable description of the cryptographic failure.
        reason: String,
    },

    /// Reading or writing persisted records failed.
    #[error("storage error: {reason}")]
    StorageError {
        /// Human-readable description of the storage failure.
        reason: String,
    },

    /// The chain collaborator could not be reached or returned an error.
    /// Transient: callers may retry.
    #[error("network error: {reason}")]
    NetworkError {
        /// Human-readable description of the network failure.
        reason: String,
    },

    /// A configuration value is invalid or missing.
    #[error("config error: {reason}")]
    ConfigError {
        /// Human-readable description of the configuration problem.
        reason: String,
    },

    /// A base-58 address is malformed.
    #[error("invalid address: {reason}")]
    InvalidAddress {
        /// Human-readable description of why the address is invalid.
        reason: String,
    },

    /// A transfer could not be built (bad amount, bad blockhash, ...).
    #[error("invalid transaction: {reason}")]
    InvalidTransaction {
        /// Human-readable description of the problem.
        reason: String,
    },
}

impl SwiftvaultError {
    /// Returns `true` if retrying the same operation later may succeed
    /// without any change of input.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NetworkError { .. } | Self::LockedOut { .. })
    }

    /// Returns `true` if the operation must halt and the user has to
    /// take explicit action (regenerate, or recover from the phrase).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::EntropySourceUnavailable { .. } | Self::VaultCorrupted { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Result alias
// ---------------------------------------------------------------------------

/// Convenience result type using [`SwiftvaultError`].
pub type Result<T> = std::result::Result<T, SwiftvaultError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
