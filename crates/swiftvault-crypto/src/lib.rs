//! Cryptographic primitives for the Swiftvault wallet.
//!
//! This crate is the **sole** location for raw cryptography. The wallet
//! crate composes these functions but never touches a cipher, hash or
//! curve directly.
//!
//! # Modules
//!
//! - [`mnemonic`]: BIP39 24-word generation, validation, seed derivation
//! - [`wordlist`]: BIP39 English word lookups
//! - [`hd_derive`]: SLIP-0010 Ed25519 derivation at the wallet path
//! - [`signing`]: Ed25519 keypair, raw key import, signatures
//! - [`kdf`]: PBKDF2-HMAC-SHA256 PIN stretching
//! - [`aead`]: XChaCha20-Poly1305 authenticated encryption
//! - [`hash`]: SHA-256 and the salted phrase digest
//! - [`random`]: OS CSPRNG access

pub mod aead;
pub mod hash;
pub mod hd_derive;
pub mod kdf;
pub mod mnemonic;
pub mod random;
pub mod signing;
pub mod wordlist;
