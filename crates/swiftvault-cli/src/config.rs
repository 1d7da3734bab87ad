//! Configuration resolution for the CLI.
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. Built-in defaults ([`WalletConfig::default`], platform data dir).
//! 2. An optional JSON file given with `--config`.
//! 3. Command-line flags.
//!
//! Example `swiftvault.json`:
//! ```json
//! {
//!   "data_dir": "/home/alice/.swiftvault",
//!   "network": "mainnet-beta",
//!   "rpc_url": "https://rpc.example.org",
//!   "kdf_iterations": 310000
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use swiftvault_types::config::WalletConfig;
use swiftvault_types::{Network, Result, SwiftvaultError};

// ---------------------------------------------------------------------------
// Config file (JSON)
// ---------------------------------------------------------------------------

/// JSON config file format. Wallet tunables sit at the top level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub data_dir: Option<String>,
    #[serde(flatten)]
    pub wallet: WalletConfig,
}

// ---------------------------------------------------------------------------
// Flag overrides
// ---------------------------------------------------------------------------

/// Values given on the command line, all optional.
#[derive(Debug, Default)]
pub struct Overrides {
    pub config_path: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub network: Option<Network>,
    pub rpc_url: Option<String>,
    pub kdf_iterations: Option<u32>,
}

// ---------------------------------------------------------------------------
// Resolved config
// ---------------------------------------------------------------------------

/// Fully resolved configuration with all defaults applied.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub data_dir: PathBuf,
    pub wallet: WalletConfig,
}

impl CliConfig {
    /// Applies defaults, the config file and then `overrides`, and
    /// validates the result.
    pub fn resolve(overrides: &Overrides) -> Result<Self> {
        let base = match &overrides.config_path {
            Some(path) => Self::load(path)?,
            None => Self {
                data_dir: default_data_dir(),
                wallet: WalletConfig::default(),
            },
        };
        let config = base.merge(overrides);
        config.wallet.validate()?;
        Ok(config)
    }

    /// Loads a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| SwiftvaultError::ConfigError {
            reason: format!("failed to read config file {}: {e}", path.display()),
        })?;
        let file: ConfigFile = serde_json::from_str(&text).map_err(|e| SwiftvaultError::ConfigError {
            reason: format!("invalid config JSON: {e}"),
        })?;

        Ok(Self {
            data_dir: file.data_dir.map(PathBuf::from).unwrap_or_else(default_data_dir),
            wallet: file.wallet,
        })
    }

    /// Merges flag overrides onto this config.
    pub fn merge(mut self, overrides: &Overrides) -> Self {
        if let Some(ref dir) = overrides.data_dir {
            self.data_dir = dir.clone();
        }
        if let Some(network) = overrides.network {
            self.wallet.network = network;
        }
        if let Some(ref url) = overrides.rpc_url {
            self.wallet.rpc_url = Some(url.clone());
        }
        if let Some(iterations) = overrides.kdf_iterations {
            self.wallet.kdf_iterations = iterations;
        }
        self
    }

    /// RPC endpoint for `network`, honouring an explicit override.
    pub fn rpc_url_for(&self, network: Network) -> &str {
        self.wallet
            .rpc_url
            .as_deref()
            .unwrap_or_else(|| network.default_rpc_url())
    }
}

/// Platform-specific default data directory.
fn default_data_dir() -> PathBuf {
    if cfg!(target_os = "linux") {
        if let Some(home) = dirs::home_dir() {
            return home.join(".swiftvault");
        }
    }
    if let Some(data) = dirs::data_dir() {
        return data.join("Swiftvault");
    }
    PathBuf::from("swiftvault-data")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_file_values() -> std::result::Result<(), SwiftvaultError> {
        let file: ConfigFile = serde_json::from_str(
            r#"{ "data_dir": "/tmp/sv", "network": "testnet", "kdf_iterations": 300000 }"#,
        )
        .map_err(|e| SwiftvaultError::ConfigError { reason: e.to_string() })?;
        assert_eq!(file.wallet.network, Network::Testnet);
        assert_eq!(file.wallet.max_pin_attempts, 5);

        let base = CliConfig {
            data_dir: PathBuf::from("/tmp/sv"),
            wallet: file.wallet,
        };
        let merged = base.merge(&Overrides {
            network: Some(Network::Mainnet),
            ..Overrides::default()
        });
        assert_eq!(merged.wallet.network, Network::Mainnet);
        assert_eq!(merged.wallet.kdf_iterations, 300_000);
        assert_eq!(merged.data_dir, PathBuf::from("/tmp/sv"));
        Ok(())
    }

    #[test]
    fn rpc_override_applies_to_every_network() {
        let config = CliConfig {
            data_dir: PathBuf::from("x"),
            wallet: WalletConfig {
                rpc_url: Some("http://127.0.0.1:8899".into()),
                ..WalletConfig::default()
            },
        };
        assert_eq!(config.rpc_url_for(Network::Mainnet), "http://127.0.0.1:8899");

        let plain = CliConfig {
            data_dir: PathBuf::from("x"),
            wallet: WalletConfig::default(),
        };
        assert_eq!(plain.rpc_url_for(Network::Testnet), "https://api.testnet.solana.com");
    }

    #[test]
    fn weak_iterations_flag_is_rejected() {
        let result = CliConfig::resolve(&Overrides {
            data_dir: Some(PathBuf::from("unused")),
            kdf_iterations: Some(1_000),
            ..Overrides::default()
        });
        assert!(matches!(result, Err(SwiftvaultError::ConfigError { .. })));
    }
}
