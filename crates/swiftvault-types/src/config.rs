//! Wallet configuration with sensible defaults.
//!
//! All tunables of the custody core are centralized here. Every value
//! has a documented default and a lower bound enforced by
//! [`WalletConfig::validate`].

use serde::{Deserialize, Serialize};

use crate::{Network, Result, SwiftvaultError};

/// Lowest PBKDF2 iteration count the vault will ever use or accept.
pub const MIN_KDF_ITERATIONS: u32 = 100_000;

/// Runtime configuration for the wallet core and its CLI.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// PBKDF2-HMAC-SHA256 iterations for new vault entries.
    /// Must be at least [`MIN_KDF_ITERATIONS`].
    pub kdf_iterations: u32,

    /// Consecutive wrong PINs tolerated before a cool-down starts.
    pub max_pin_attempts: u32,

    /// First cool-down length in seconds. Doubles with every further
    /// failure.
    pub lockout_base_secs: u64,

    /// Upper bound on a single cool-down in seconds.
    pub lockout_max_secs: u64,

    /// How many times the recovery-phrase challenge may be answered
    /// before the pending wallet is discarded.
    pub phrase_verification_attempts: u32,

    /// Cluster selected when no remembered preference exists.
    pub network: Network,

    /// JSON-RPC endpoint override. `None` uses the network default.
    pub rpc_url: Option<String>,

    /// HTTP timeout for chain calls, in seconds.
    pub rpc_timeout_secs: u64,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            kdf_iterations: 210_000,
            max_pin_attempts: 5,
            lockout_base_secs: 30,
            lockout_max_secs: 3_600,
            phrase_verification_attempts: 3,
            network: Network::Devnet,
            rpc_url: None,
            rpc_timeout_secs: 30,
        }
    }
}

impl WalletConfig {
    /// Validates all configuration values.
    ///
    /// Returns an error if any value is outside its acceptable range.
    pub fn validate(&self) -> Result<()> {
        if self.kdf_iterations < MIN_KDF_ITERATIONS {
            return Err(SwiftvaultError::ConfigError {
                reason: format!(
                    "kdf_iterations must be at least {MIN_KDF_ITERATIONS}, got {}",
                    self.kdf_iterations
                ),
            });
        }

        if self.max_pin_attempts == 0 {
            return Err(SwiftvaultError::ConfigError {
                reason: "max_pin_attempts must be greater than 0".into(),
            });
        }

        if self.lockout_base_secs == 0 {
            return Err(SwiftvaultError::ConfigError {
                reason: "lockout_base_secs must be greater than 0".into(),
            });
        }

        if self.lockout_max_secs < self.lockout_base_secs {
            return Err(SwiftvaultError::ConfigError {
                reason: "lockout_max_secs must not be below lockout_base_secs".into(),
            });
        }

        if self.phrase_verification_attempts == 0 {
            return Err(SwiftvaultError::ConfigError {
                reason: "phrase_verification_attempts must be greater than 0".into(),
            });
        }

        if self.rpc_timeout_secs == 0 {
            return Err(SwiftvaultError::ConfigError {
                reason: "rpc_timeout_secs must be greater than 0".into(),
            });
        }

        if let Some(url) = &self.rpc_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(SwiftvaultError::ConfigError {
                    reason: format!("rpc_url must be an http(s) URL, got '{url}'"),
                });
            }
        }

        Ok(())
    }

    /// Endpoint for the configured network, honouring the override.
    pub fn effective_rpc_url(&self) -> &str {
        self.rpc_url
            .as_deref()
            .unwrap_or_else(|| self.network.default_rpc_url())
    }
}
