//! Command handlers.

pub mod account;
pub mod wallet;

use swiftvault_types::Result;

use crate::{App, Commands};

/// Dispatches one parsed command.
pub async fn run(app: &mut App, command: Commands) -> Result<()> {
    match command {
        Commands::Create => wallet::create(app).await,
        Commands::Import => wallet::import(app).await,
        Commands::Recover => wallet::recover(app).await,
        Commands::Lookup => wallet::lookup(app),
        Commands::Status => wallet::status(app),
        Commands::ExportKey => wallet::export_key(app).await,
        Commands::Forget { yes } => wallet::forget(app, yes),
        Commands::Balance { address } => account::balance(app, address).await,
        Commands::Tokens { address } => account::tokens(app, address).await,
        Commands::Send { to, amount } => account::send(app, &to, &amount).await,
        Commands::Sign { message } => account::sign(app, &message).await,
    }
}
