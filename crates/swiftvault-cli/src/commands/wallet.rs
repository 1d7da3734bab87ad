//! Wallet lifecycle commands: create, import, recover, lookup, status,
//! export and forget.

use swiftvault_types::{Result, SessionStatus, SwiftvaultError};
use swiftvault_wallet::session::WalletSession;
use zeroize::Zeroizing;

use crate::output;
use crate::prompt;
use crate::App;

fn print_session(session: &WalletSession, headline: &str, json: bool) {
    if json {
        output::print_value(session, true);
    } else {
        output::print_success(headline, false);
        output::print_fields(
            &[
                ("address", session.public_key.to_base58()),
                ("network", session.network.to_string()),
            ],
            false,
        );
    }
}

/// Creates a wallet, shows its phrase and asks for three of its words
/// until they match or the attempts run out.
pub async fn create(app: &mut App) -> Result<()> {
    let pin = prompt::read_new_pin()?;
    let public_key = app.manager.begin_creation(pin).await?;

    {
        let phrase = app.manager.pending_phrase()?;
        if app.json {
            let obj = serde_json::json!({
                "publicKey": public_key.to_base58(),
                "phrase": phrase,
            });
            eprintln!("{obj}");
        } else {
            output::print_warning("write these words down; they are the only backup of this wallet", false);
            for (i, word) in phrase.split_whitespace().enumerate() {
                eprint!("{:>2}. {:<10}", i + 1, word);
                if (i + 1) % 4 == 0 {
                    eprintln!();
                }
            }
            eprintln!();
        }
    }

    loop {
        let positions = app.manager.challenge_positions()?;
        let mut answers: Vec<Zeroizing<String>> = Vec::with_capacity(positions.len());
        for pos in positions {
            match prompt::read_line(&format!("Word #{pos}: ")) {
                Ok(word) => answers.push(word),
                Err(e) => {
                    app.manager.abandon_creation()?;
                    return Err(e);
                }
            }
        }
        let words: Vec<&str> = answers.iter().map(|w| w.as_str()).collect();

        match app.manager.confirm_phrase(&words) {
            Ok(session) => {
                print_session(&session, "Wallet created", app.json);
                return Ok(());
            }
            Err(SwiftvaultError::PhraseVerificationFailed)
                if app.manager.status() == SessionStatus::AwaitingConfirmation =>
            {
                output::print_warning("those words do not match, try again", app.json);
            }
            Err(e) => return Err(e),
        }
    }
}

/// Imports a hex private key.
pub async fn import(app: &mut App) -> Result<()> {
    let key = prompt::read_secret("Private key (hex): ")?;
    let pin = prompt::read_new_pin()?;
    let session = app.manager.import_private_key(key.trim(), pin).await?;
    print_session(&session, "Wallet imported", app.json);
    Ok(())
}

/// Recovers a wallet from its phrase under a new PIN.
pub async fn recover(app: &mut App) -> Result<()> {
    let phrase = prompt::read_secret("Recovery phrase: ")?;
    if let Some(existing) = app.manager.lookup_by_phrase(&phrase)? {
        output::print_warning(
            &format!("{existing} is already stored; its PIN will be replaced"),
            app.json,
        );
    }
    let pin = prompt::read_new_pin()?;
    let session = app.manager.recover_from_phrase(&phrase, pin).await?;
    print_session(&session, "Wallet recovered", app.json);
    Ok(())
}

/// Reports which stored wallet a phrase belongs to.
pub fn lookup(app: &mut App) -> Result<()> {
    let phrase = prompt::read_secret("Recovery phrase: ")?;
    match app.manager.lookup_by_phrase(&phrase)? {
        Some(public_key) => {
            output::print_fields(&[("address", public_key.to_base58())], app.json);
            Ok(())
        }
        None => Err(SwiftvaultError::WalletNotFound {
            reason: "no stored wallet matches this phrase".into(),
        }),
    }
}

/// Shows the session status without asking for anything.
pub fn status(app: &mut App) -> Result<()> {
    let address = app
        .manager
        .public_key()
        .map(|pk| pk.to_base58())
        .unwrap_or_else(|| "-".into());
    output::print_fields(
        &[
            ("status", app.manager.status().to_string()),
            ("address", address),
            ("network", app.manager.network().to_string()),
            ("data_dir", app.config.data_dir.display().to_string()),
        ],
        app.json,
    );
    Ok(())
}

/// Prints the private key after checking the PIN.
pub async fn export_key(app: &mut App) -> Result<()> {
    let pin = prompt::read_pin()?;
    let key = app.manager.export_private_key(pin).await?;
    output::print_warning("anyone holding this key controls the wallet", app.json);
    if app.json {
        println!("{}", serde_json::json!({ "privateKey": key.as_str() }));
    } else {
        println!("{}", key.as_str());
    }
    Ok(())
}

/// Deletes the selected wallet.
pub fn forget(app: &mut App, yes: bool) -> Result<()> {
    let public_key = app.manager.public_key().ok_or_else(|| SwiftvaultError::WalletNotFound {
        reason: "no wallet on this device".into(),
    })?;

    if !yes && !prompt::confirm(&format!("Delete {public_key} from this device?"))? {
        output::print_success("Nothing deleted", app.json);
        return Ok(());
    }

    let status = app.manager.forget_wallet()?;
    output::print_success(&format!("Forgot {public_key}"), app.json);
    if status == SessionStatus::Locked {
        if let Some(next) = app.manager.public_key() {
            output::print_fields(&[("selected", next.to_base58())], app.json);
        }
    }
    Ok(())
}
