//! PIN strength policy.
//!
//! A [`Pin`] can only be obtained through [`Pin::parse`], so every
//! vault operation receives input that already passed the policy.

use swiftvault_types::{Result, SwiftvaultError};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Shortest accepted PIN.
pub const MIN_PIN_LEN: usize = 4;

/// Longest accepted PIN.
pub const MAX_PIN_LEN: usize = 12;

/// A policy-checked numeric PIN. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Pin(String);

impl Pin {
    /// Checks `input` against the policy: 4 to 12 ASCII digits, nothing
    /// else. Surrounding whitespace is not trimmed.
    ///
    /// # Errors
    ///
    /// [`SwiftvaultError::WeakPin`] naming the violated rule.
    pub fn parse(input: &str) -> Result<Self> {
        if !input.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SwiftvaultError::WeakPin {
                reason: "PIN must contain digits only".into(),
            });
        }
        if input.len() < MIN_PIN_LEN {
            return Err(SwiftvaultError::WeakPin {
                reason: format!("PIN must be at least {MIN_PIN_LEN} digits"),
            });
        }
        if input.len() > MAX_PIN_LEN {
            return Err(SwiftvaultError::WeakPin {
                reason: format!("PIN must be at most {MAX_PIN_LEN} digits"),
            });
        }
        Ok(Self(input.to_owned()))
    }

    /// Raw bytes fed to the KDF.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

// Pin does not implement Clone/Debug to prevent leakage.
