//! Key custody core for the Swiftvault wallet.
//!
//! Handles the full wallet lifecycle:
//!
//! - **Create** a 24-word wallet and confirm its recovery phrase
//! - **Seal** the private key under a PIN (PBKDF2-HMAC-SHA256 + XChaCha20-Poly1305)
//! - **Lock / Unlock** with exponential lockout on wrong PINs
//! - **Import** a raw private key, **recover** from a phrase
//! - **Sign** transfers client-side and submit only signed bytes
//! - **Restore** the last session at startup without decrypting

pub mod pin;
pub mod recovery;
pub mod repository;
pub(crate) mod serde_hex;
pub mod session;
pub mod throttle;
pub mod transaction;
pub mod vault;

pub use pin::Pin;
pub use repository::{JsonFileRepository, MemoryRepository, VaultRepository};
pub use session::{SessionManager, SessionState, WalletSession};
