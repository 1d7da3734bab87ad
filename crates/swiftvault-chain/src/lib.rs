//! Chain collaborator contract for the Swiftvault wallet.
//!
//! The custody core only ever needs four things from the chain: a
//! native balance, the token accounts of an address, a recent
//! blockhash to anchor a transfer, and a way to submit a transaction
//! that is already signed. [`ChainClient`] is that contract; the
//! wallet never hands a private key across it.
//!
//! [`rpc::JsonRpcChainClient`] implements it over HTTP JSON-RPC.

pub mod rpc;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use swiftvault_types::{PublicKey, Result, SwiftvaultError};

pub use rpc::JsonRpcChainClient;

// ---------------------------------------------------------------------------
// TokenAccount
// ---------------------------------------------------------------------------

/// One SPL token holding of an owner, amounts in raw base units.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TokenAccount {
    /// Token mint address.
    pub mint: PublicKey,
    /// Raw amount; divide by `10^decimals` for display.
    pub amount_raw: u64,
    /// Decimal places of the mint.
    pub decimals: u8,
    /// Wallet that owns the token account.
    pub owner: PublicKey,
}

// ---------------------------------------------------------------------------
// Blockhash
// ---------------------------------------------------------------------------

/// Recent blockhash a transaction is anchored to.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct Blockhash([u8; 32]);

impl Blockhash {
    /// Creates a [`Blockhash`] from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying 32-byte array.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Blockhash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blockhash({self})")
    }
}

impl fmt::Display for Blockhash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl FromStr for Blockhash {
    type Err = SwiftvaultError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| SwiftvaultError::InvalidTransaction {
                reason: format!("invalid blockhash encoding: {e}"),
            })?;
        let arr: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            SwiftvaultError::InvalidTransaction {
                reason: format!("blockhash must be 32 bytes, got {}", v.len()),
            }
        })?;
        Ok(Self(arr))
    }
}

// ---------------------------------------------------------------------------
// TransactionSignature
// ---------------------------------------------------------------------------

/// Base-58 transaction id returned by the chain after submission.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionSignature(String);

impl TransactionSignature {
    /// Wraps a base-58 signature string.
    pub fn new(signature: impl Into<String>) -> Self {
        Self(signature.into())
    }

    /// Returns the signature string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// ChainClient
// ---------------------------------------------------------------------------

/// Read and submit access to the remote chain.
///
/// All failures are [`SwiftvaultError::NetworkError`] and transient.
/// An unavailable value is an error, never a default zero.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Native balance of `owner` in lamports.
    async fn get_balance(&self, owner: &PublicKey) -> Result<u64>;

    /// Token accounts held by `owner`.
    async fn get_token_accounts(&self, owner: &PublicKey) -> Result<Vec<TokenAccount>>;

    /// A recent blockhash for building a transaction.
    async fn latest_blockhash(&self) -> Result<Blockhash>;

    /// Submits a fully signed, serialised transaction.
    async fn submit_transaction(&self, signed_tx: &[u8]) -> Result<TransactionSignature>;
}

#[async_trait]
impl<T: ChainClient + ?Sized> ChainClient for Arc<T> {
    async fn get_balance(&self, owner: &PublicKey) -> Result<u64> {
        (**self).get_balance(owner).await
    }

    async fn get_token_accounts(&self, owner: &PublicKey) -> Result<Vec<TokenAccount>> {
        (**self).get_token_accounts(owner).await
    }

    async fn latest_blockhash(&self) -> Result<Blockhash> {
        (**self).latest_blockhash().await
    }

    async fn submit_transaction(&self, signed_tx: &[u8]) -> Result<TransactionSignature> {
        (**self).submit_transaction(signed_tx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blockhash_base58_roundtrip() -> std::result::Result<(), SwiftvaultError> {
        let hash = Blockhash::from_bytes([7u8; 32]);
        let parsed: Blockhash = hash.to_string().parse()?;
        assert_eq!(parsed, hash);
        Ok(())
    }

    #[test]
    fn blockhash_rejects_wrong_length() {
        assert!("3yZe7d".parse::<Blockhash>().is_err());
        assert!("0OIl".parse::<Blockhash>().is_err());
    }

    #[test]
    fn transaction_signature_serializes_as_plain_string() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let sig = TransactionSignature::new("5VERv8NMvzbJMEkV8xnrLkEaWRtSz9CosKDYjCJjBRnbJLgp8uirBgmQpjKhoR4tjF3ZpRzrFmBV6UjKdiSZkQUW");
        let json = serde_json::to_string(&sig)?;
        assert!(json.starts_with("\"5VERv8"));
        Ok(())
    }
}
