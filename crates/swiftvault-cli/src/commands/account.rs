//! Chain-facing commands: balance, tokens, send and sign.

use swiftvault_types::{PublicKey, Result, SwiftvaultError};
use swiftvault_wallet::transaction::{format_lamports, parse_amount};

use crate::output;
use crate::prompt;
use crate::App;

/// Explicit address if given, else the selected wallet.
fn target(app: &App, address: Option<String>) -> Result<PublicKey> {
    match address {
        Some(address) => address.parse(),
        None => app.manager.public_key().ok_or_else(|| SwiftvaultError::WalletNotFound {
            reason: "no wallet on this device".into(),
        }),
    }
}

pub async fn balance(app: &mut App, address: Option<String>) -> Result<()> {
    let owner = target(app, address)?;
    let lamports = app.chain.get_balance(&owner).await?;

    if app.json {
        let obj = serde_json::json!({
            "address": owner.to_base58(),
            "lamports": lamports,
            "sol": format_lamports(lamports),
        });
        println!("{obj}");
    } else {
        output::print_fields(
            &[
                ("address", owner.to_base58()),
                ("balance", format!("{} SOL", format_lamports(lamports))),
            ],
            false,
        );
    }
    Ok(())
}

pub async fn tokens(app: &mut App, address: Option<String>) -> Result<()> {
    let owner = target(app, address)?;
    let accounts = app.chain.get_token_accounts(&owner).await?;

    let rows: Vec<Vec<String>> = accounts
        .iter()
        .map(|acc| {
            vec![
                acc.mint.to_base58(),
                output::format_token_amount(acc.amount_raw, acc.decimals),
                acc.decimals.to_string(),
            ]
        })
        .collect();
    output::print_table(&["mint", "amount", "decimals"], &rows, app.json);
    Ok(())
}

/// Unlocks with the PIN, then signs and submits a transfer.
pub async fn send(app: &mut App, to: &str, amount: &str) -> Result<()> {
    let recipient: PublicKey = to.parse()?;
    let lamports = parse_amount(amount)?;

    let pin = prompt::read_pin()?;
    app.manager.unlock(pin).await?;

    let signature = app.manager.send_transfer(&recipient, lamports).await;
    app.manager.logout();
    let signature = signature?;

    if app.json {
        let obj = serde_json::json!({
            "signature": signature.as_str(),
            "to": recipient.to_base58(),
            "lamports": lamports,
        });
        println!("{obj}");
    } else {
        output::print_success(
            &format!("Sent {} SOL to {recipient}", format_lamports(lamports)),
            false,
        );
        output::print_fields(&[("signature", signature.to_string())], false);
    }
    Ok(())
}

/// Unlocks with the PIN and signs `message`.
pub async fn sign(app: &mut App, message: &str) -> Result<()> {
    let pin = prompt::read_pin()?;
    let session = app.manager.unlock(pin).await?;
    let signature = app.manager.sign(message.as_bytes());
    app.manager.logout();
    let signature = signature?;

    output::print_fields(
        &[
            ("address", session.public_key.to_base58()),
            ("signature", signature.to_base58()),
        ],
        app.json,
    );
    Ok(())
}
