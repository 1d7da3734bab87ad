//! Swiftvault command-line wallet.
//!
//! Each invocation restores the stored session, runs one command and
//! exits. Secrets are read from stdin (or `SWIFTVAULT_PIN`) and never
//! accepted as flags.

mod commands;
mod config;
mod output;
mod prompt;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use swiftvault_chain::{ChainClient, JsonRpcChainClient};
use swiftvault_types::{Network, Result};
use swiftvault_wallet::{JsonFileRepository, SessionManager};
use tracing_subscriber::EnvFilter;

use crate::config::{CliConfig, Overrides};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Swiftvault: a PIN-protected Solana wallet.
#[derive(Parser)]
#[command(name = "swiftvault", version, about)]
struct Cli {
    /// Output in JSON format (no colors, machine-readable).
    #[arg(long, global = true)]
    json: bool,

    /// Directory holding vault records and session preferences.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Path to a JSON config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cluster to use: mainnet-beta, devnet or testnet. Remembered.
    #[arg(long, global = true)]
    network: Option<Network>,

    /// JSON-RPC endpoint, overriding the network default.
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// PBKDF2 iterations for newly sealed keys.
    #[arg(long, global = true)]
    kdf_iterations: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Create a new wallet and confirm its recovery phrase.
    Create,
    /// Import a hex private key (64-byte keypair or 32-byte seed) read
    /// from stdin.
    Import,
    /// Recover a wallet from its 24-word phrase (read from stdin).
    Recover,
    /// Find the stored wallet that belongs to a phrase.
    Lookup,
    /// Show the session status and selected wallet.
    Status,
    /// Native SOL balance.
    Balance {
        /// Address to query instead of the selected wallet.
        address: Option<String>,
    },
    /// SPL token holdings.
    Tokens {
        /// Address to query instead of the selected wallet.
        address: Option<String>,
    },
    /// Sign and submit a SOL transfer.
    Send {
        /// Recipient address (base-58).
        to: String,
        /// Amount in SOL, up to 9 decimals.
        amount: String,
    },
    /// Sign an arbitrary UTF-8 message.
    Sign {
        /// Message to sign.
        message: String,
    },
    /// Print the selected wallet's private key after checking the PIN.
    ExportKey,
    /// Delete the selected wallet from this device.
    Forget {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

// ---------------------------------------------------------------------------
// Application context passed to every command handler
// ---------------------------------------------------------------------------

/// Everything a command needs.
pub(crate) struct App {
    pub json: bool,
    pub config: CliConfig,
    pub manager: SessionManager<JsonFileRepository>,
    pub chain: Arc<dyn ChainClient>,
}

impl App {
    fn open(cli: &Cli) -> Result<Self> {
        let overrides = Overrides {
            config_path: cli.config.clone(),
            data_dir: cli.data_dir.clone(),
            network: cli.network,
            rpc_url: cli.rpc_url.clone(),
            kdf_iterations: cli.kdf_iterations,
        };
        let config = CliConfig::resolve(&overrides)?;
        tracing::debug!(data_dir = %config.data_dir.display(), "configuration resolved");

        let repo = JsonFileRepository::open(&config.data_dir)?;
        let chain = connect(&config, config.wallet.network)?;
        let mut manager = SessionManager::new(config.wallet.clone(), repo, chain)?;
        manager.restore()?;

        // An explicit flag wins over the remembered network.
        if let Some(network) = cli.network {
            manager.set_network(network)?;
        }

        let chain = connect(&config, manager.network())?;
        manager.set_chain_client(Arc::clone(&chain));

        Ok(Self {
            json: cli.json,
            config,
            manager,
            chain,
        })
    }
}

fn connect(config: &CliConfig, network: Network) -> Result<Arc<dyn ChainClient>> {
    let client = JsonRpcChainClient::new(
        config.rpc_url_for(network),
        Duration::from_secs(config.wallet.rpc_timeout_secs),
    )?;
    Ok(Arc::new(client))
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let json = cli.json;
    let result = match App::open(&cli) {
        Ok(mut app) => commands::run(&mut app, cli.command).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        output::print_error(&e, json);
        std::process::exit(1);
    }
}
