//! Reading secrets and answers from the terminal.
//!
//! Prompts go to stderr so stdout stays clean for `--json`. On a
//! terminal, secrets are typed without echo; piped stdin is read line
//! by line, which keeps every flow scriptable.

use std::io::{BufRead, IsTerminal, Write};

use swiftvault_types::{Result, SwiftvaultError};
use swiftvault_wallet::Pin;
use zeroize::Zeroizing;

/// Environment variable consulted before prompting for a PIN.
pub const PIN_ENV: &str = "SWIFTVAULT_PIN";

fn input_error(e: std::io::Error) -> SwiftvaultError {
    SwiftvaultError::InvalidState {
        reason: format!("failed to read input: {e}"),
    }
}

/// Prints `label` to stderr and reads one line from stdin, without the
/// trailing newline.
///
/// # Errors
///
/// [`SwiftvaultError::InvalidState`] if stdin is closed.
pub fn read_line(label: &str) -> Result<Zeroizing<String>> {
    eprint!("{label}");
    let _ = std::io::stderr().flush();

    let mut line = Zeroizing::new(String::new());
    let read = std::io::stdin().lock().read_line(&mut line).map_err(input_error)?;
    if read == 0 {
        return Err(SwiftvaultError::InvalidState {
            reason: "input closed".into(),
        });
    }

    let trimmed_len = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(trimmed_len);
    Ok(line)
}

/// Like [`read_line`], but hides the input when stdin is a terminal.
pub fn read_secret(label: &str) -> Result<Zeroizing<String>> {
    if std::io::stdin().is_terminal() {
        rpassword::prompt_password(label)
            .map(Zeroizing::new)
            .map_err(input_error)
    } else {
        read_line(label)
    }
}

/// PIN for unlocking an existing wallet.
pub fn read_pin() -> Result<Pin> {
    let raw = match std::env::var(PIN_ENV) {
        Ok(value) => Zeroizing::new(value),
        Err(_) => read_secret("PIN: ")?,
    };
    Pin::parse(&raw)
}

/// PIN for sealing a new wallet, entered twice when prompted.
pub fn read_new_pin() -> Result<Pin> {
    if let Ok(value) = std::env::var(PIN_ENV) {
        return Pin::parse(&Zeroizing::new(value));
    }

    let first = read_secret("New PIN (4-12 digits): ")?;
    let pin = Pin::parse(&first)?;
    let second = read_secret("Repeat PIN: ")?;
    if first.as_str() != second.as_str() {
        return Err(SwiftvaultError::WeakPin {
            reason: "the two PINs do not match".into(),
        });
    }
    Ok(pin)
}

/// Asks a yes/no question; anything but `y`/`yes` is a no.
pub fn confirm(question: &str) -> Result<bool> {
    let answer = read_line(&format!("{question} [y/N]: "))?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
