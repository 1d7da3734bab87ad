//! Session and restoration manager.
//!
//! [`SessionManager`] owns the only in-memory copy of a decrypted
//! keypair and drives the wallet lifecycle:
//!
//! ```text
//!              begin_creation            confirm_phrase
//! NoWallet ─────────────────▶ AwaitingConfirmation ─────────▶ Active
//!    ▲  │                          │ exhausted / abandon         │  ▲
//!    │  │ import / recover         ▼                      logout │  │ unlock
//!    │  └──────────────────────▶ Active                          ▼  │
//!    └──────────── forget_wallet ─────────────────────────── Locked
//! ```
//!
//! Leaving `Active` drops the keypair, which zeroizes it. Every
//! operation that runs the PIN KDF awaits a `spawn_blocking` task that
//! owns its secret inputs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use swiftvault_chain::{ChainClient, TokenAccount, TransactionSignature};
use swiftvault_crypto::hd_derive::derive_keypair;
use swiftvault_crypto::mnemonic::{generate_mnemonic, Mnemonic};
use swiftvault_crypto::signing::{Keypair, Signature};
use swiftvault_types::config::WalletConfig;
use swiftvault_types::{Network, PublicKey, Result, SessionStatus, SwiftvaultError, Timestamp};
use tokio::task::JoinError;
use zeroize::Zeroizing;

use crate::pin::Pin;
use crate::recovery::{Confirmation, PendingWallet, RecoveryChallenge, CHALLENGE_WORDS};
use crate::repository::{PhraseDigest, RecordStatus, SessionPrefs, VaultRecord, VaultRepository};
use crate::throttle::ThrottlePolicy;
use crate::transaction::build_transfer;
use crate::vault::{EncryptedVaultEntry, Vault};

/// Source of the current time, replaceable in tests.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

// ---------------------------------------------------------------------------
// WalletSession
// ---------------------------------------------------------------------------

/// Public description of an unlocked wallet. Holds no secret.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSession {
    /// Active wallet.
    pub public_key: PublicKey,
    /// Network the session talks to.
    pub network: Network,
    /// When the keypair was decrypted.
    pub unlocked_at: Timestamp,
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Unlocked session together with its keypair.
pub struct ActiveSession {
    session: WalletSession,
    keypair: Keypair,
}

impl ActiveSession {
    /// Public session details.
    pub fn session(&self) -> &WalletSession {
        &self.session
    }
}

/// Lifecycle state of the session.
pub enum SessionState {
    /// No wallet is stored.
    NoWallet,
    /// A new wallet waits for its phrase to be confirmed.
    AwaitingConfirmation(PendingWallet),
    /// A wallet is selected; its key stays encrypted.
    Locked {
        /// Selected wallet.
        public_key: PublicKey,
    },
    /// The selected wallet's keypair is in memory.
    Active(ActiveSession),
}

impl SessionState {
    /// Coarse status without any secret.
    pub fn status(&self) -> SessionStatus {
        match self {
            Self::NoWallet => SessionStatus::NoWallet,
            Self::AwaitingConfirmation(_) => SessionStatus::AwaitingConfirmation,
            Self::Locked { .. } => SessionStatus::Locked,
            Self::Active(_) => SessionStatus::Active,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionManager
// ---------------------------------------------------------------------------

/// Single owner of the wallet session on this device.
pub struct SessionManager<R: VaultRepository> {
    repo: R,
    chain: Arc<dyn ChainClient>,
    config: WalletConfig,
    vault: Vault,
    network: Network,
    state: SessionState,
    clock: Clock,
}

fn join_error(e: JoinError) -> SwiftvaultError {
    SwiftvaultError::CryptoError {
        reason: format!("vault task failed: {e}"),
    }
}

impl<R: VaultRepository> SessionManager<R> {
    /// Creates a manager in `NoWallet`. Call [`restore`](Self::restore)
    /// to pick up a stored wallet.
    ///
    /// # Errors
    ///
    /// [`SwiftvaultError::ConfigError`] if `config` is invalid.
    pub fn new(config: WalletConfig, repo: R, chain: Arc<dyn ChainClient>) -> Result<Self> {
        config.validate()?;
        let vault = Vault::new(config.kdf_iterations)?;
        Ok(Self {
            repo,
            chain,
            network: config.network,
            config,
            vault,
            state: SessionState::NoWallet,
            clock: Arc::new(Utc::now),
        })
    }

    /// Replaces the clock used for lockouts and session timestamps.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Swaps the chain client, e.g. after [`set_network`](Self::set_network).
    pub fn set_chain_client(&mut self, chain: Arc<dyn ChainClient>) {
        self.chain = chain;
    }

    /// Backing repository.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Current coarse status.
    pub fn status(&self) -> SessionStatus {
        self.state.status()
    }

    /// Selected network.
    pub fn network(&self) -> Network {
        self.network
    }

    /// Public key of the selected, pending or active wallet.
    pub fn public_key(&self) -> Option<PublicKey> {
        match &self.state {
            SessionState::NoWallet => None,
            SessionState::AwaitingConfirmation(pending) => Some(pending.public_key()),
            SessionState::Locked { public_key } => Some(*public_key),
            SessionState::Active(active) => Some(active.session.public_key),
        }
    }

    /// Session details while `Active`.
    pub fn session(&self) -> Option<&WalletSession> {
        match &self.state {
            SessionState::Active(active) => Some(&active.session),
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Restoration
    // -----------------------------------------------------------------------

    /// Rebuilds the state from storage, at startup.
    ///
    /// Process:
    /// 1. Drop any in-memory session.
    /// 2. Delete records whose creation was never confirmed.
    /// 3. Select the remembered wallet, else the first stored one.
    ///
    /// Never decrypts anything; a stored wallet comes back `Locked`.
    /// Records that fail to parse are kept and reported on unlock.
    pub fn restore(&mut self) -> Result<SessionStatus> {
        self.state = SessionState::NoWallet;

        for id in self.repo.list_ids()? {
            match self.repo.get(&id) {
                Ok(Some(record)) if record.status == RecordStatus::Unconfirmed => {
                    self.repo.remove(&id)?;
                    tracing::info!(public_key = %id, "purged unconfirmed wallet");
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(public_key = %id, error = %e, "stored wallet unreadable"),
            }
        }

        let prefs = self.repo.load_prefs()?;
        let status = self.settle(prefs)?;
        tracing::debug!(status = %status, network = %self.network, "session restored");
        Ok(status)
    }

    /// Selects a stored wallet after the current one went away.
    fn settle(&mut self, prefs: Option<SessionPrefs>) -> Result<SessionStatus> {
        let ids = self.repo.list_ids()?;

        match prefs.filter(|p| ids.contains(&p.public_key)) {
            Some(prefs) => {
                self.network = prefs.network;
                self.state = SessionState::Locked {
                    public_key: prefs.public_key,
                };
            }
            None => match ids.first() {
                Some(&public_key) => {
                    if let Ok(Some(record)) = self.repo.get(&public_key) {
                        self.network = record.network;
                    }
                    self.state = SessionState::Locked { public_key };
                    self.remember(public_key)?;
                }
                None => {
                    self.repo.clear_prefs()?;
                    self.state = SessionState::NoWallet;
                }
            },
        }
        Ok(self.status())
    }

    fn remember(&self, public_key: PublicKey) -> Result<()> {
        self.repo.save_prefs(&SessionPrefs {
            public_key,
            network: self.network,
        })
    }

    /// Creation, import and recovery start from a resting state.
    fn ensure_idle(&self, action: &str) -> Result<()> {
        match self.state {
            SessionState::NoWallet | SessionState::Locked { .. } => Ok(()),
            SessionState::AwaitingConfirmation(_) => Err(SwiftvaultError::InvalidState {
                reason: format!("cannot {action} while a new wallet awaits confirmation"),
            }),
            SessionState::Active(_) => Err(SwiftvaultError::InvalidState {
                reason: format!("cannot {action} while a wallet is unlocked; log out first"),
            }),
        }
    }

    /// Wallet chosen for read access and PIN checks.
    fn selected_wallet(&self) -> Result<PublicKey> {
        match &self.state {
            SessionState::Locked { public_key } => Ok(*public_key),
            SessionState::Active(active) => Ok(active.session.public_key),
            SessionState::AwaitingConfirmation(_) => Err(SwiftvaultError::InvalidState {
                reason: "wallet creation is not confirmed yet".into(),
            }),
            SessionState::NoWallet => Err(SwiftvaultError::WalletNotFound {
                reason: "no wallet on this device".into(),
            }),
        }
    }

    /// Drops the keypair if `public_key` is the active wallet.
    fn end_session_for(&mut self, public_key: PublicKey) {
        let active_here = matches!(
            &self.state,
            SessionState::Active(active) if active.session.public_key == public_key
        );
        if active_here {
            self.state = SessionState::Locked { public_key };
            tracing::warn!(public_key = %public_key, "session ended by PIN lockout");
        }
    }

    fn activate(&mut self, keypair: Keypair) -> Result<WalletSession> {
        let session = WalletSession {
            public_key: keypair.public_key(),
            network: self.network,
            unlocked_at: Timestamp::from_datetime((self.clock)()),
        };
        self.state = SessionState::Active(ActiveSession {
            session: session.clone(),
            keypair,
        });
        self.remember(session.public_key)?;
        tracing::info!(public_key = %session.public_key, network = %session.network, "session active");
        Ok(session)
    }

    // -----------------------------------------------------------------------
    // Vault work
    // -----------------------------------------------------------------------

    async fn seal(&self, keypair: Keypair, pin: Pin) -> Result<(Keypair, EncryptedVaultEntry)> {
        let vault = self.vault;
        let (keypair, entry) = tokio::task::spawn_blocking(move || {
            let entry = vault.lock(&keypair, &pin);
            (keypair, entry)
        })
        .await
        .map_err(join_error)?;
        Ok((keypair, entry?))
    }

    /// Checks `pin` against a stored wallet under the throttle.
    ///
    /// Process:
    /// 1. Load the record; it must be confirmed.
    /// 2. Refuse with `LockedOut` during a cool-down, before any KDF.
    /// 3. Open the vault on a blocking thread.
    /// 4. Persist the updated failure counter.
    ///
    /// A lockout, whether already running or started by this failure,
    /// ends an active session for the same wallet.
    async fn open(&mut self, public_key: PublicKey, pin: Pin) -> Result<Keypair> {
        let mut record = self
            .repo
            .get(&public_key)?
            .ok_or_else(|| SwiftvaultError::WalletNotFound {
                reason: format!("no stored wallet {public_key}"),
            })?;
        if record.status != RecordStatus::Active {
            return Err(SwiftvaultError::InvalidState {
                reason: "wallet creation was never confirmed".into(),
            });
        }
        if let Err(e) = record.throttle.check((self.clock)()) {
            self.end_session_for(public_key);
            return Err(e);
        }

        let vault = self.vault;
        let entry = record.entry.clone();
        let opened = tokio::task::spawn_blocking(move || vault.unlock(&entry, &pin))
            .await
            .map_err(join_error)?;

        match opened {
            Ok(keypair) => {
                if record.throttle.record_success() {
                    self.repo.put(&public_key, &record)?;
                }
                Ok(keypair)
            }
            Err(SwiftvaultError::IncorrectPin) => {
                let policy = ThrottlePolicy::from(&self.config);
                let lockout_secs = record.throttle.record_failure(&policy, (self.clock)());
                self.repo.put(&public_key, &record)?;
                tracing::warn!(
                    public_key = %public_key,
                    failures = record.throttle.consecutive_failures(),
                    lockout_secs = ?lockout_secs,
                    "incorrect PIN"
                );
                if lockout_secs.is_some() {
                    self.end_session_for(public_key);
                }
                Err(SwiftvaultError::IncorrectPin)
            }
            Err(e) => {
                tracing::error!(public_key = %public_key, error = %e, "vault entry could not be opened");
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    /// Generates a new wallet sealed under `pin` and stores it
    /// unconfirmed.
    ///
    /// Process:
    /// 1. Generate a 24-word phrase and derive the keypair.
    /// 2. Pick the three challenge positions.
    /// 3. Seal the keypair and store the record as `Unconfirmed`.
    /// 4. Enter `AwaitingConfirmation`; the phrase is shown via
    ///    [`pending_phrase`](Self::pending_phrase).
    pub async fn begin_creation(&mut self, pin: Pin) -> Result<PublicKey> {
        self.ensure_idle("create a wallet")?;

        let mnemonic = generate_mnemonic()?;
        let keypair = derive_keypair(&mnemonic)?;
        let public_key = keypair.public_key();
        let digest = PhraseDigest::new(mnemonic.as_str())?;
        let challenge = RecoveryChallenge::new(public_key, &mnemonic)?;

        let (keypair, entry) = self.seal(keypair, pin).await?;
        let record = VaultRecord::new(entry, RecordStatus::Unconfirmed, self.network, Some(digest));
        self.repo.put(&public_key, &record)?;

        let attempts = self.config.phrase_verification_attempts;
        let pending = PendingWallet::new(mnemonic, keypair, challenge, attempts)?;
        self.state = SessionState::AwaitingConfirmation(pending);
        tracing::info!(public_key = %public_key, "wallet created, awaiting phrase confirmation");
        Ok(public_key)
    }

    fn pending(&self) -> Result<&PendingWallet> {
        match &self.state {
            SessionState::AwaitingConfirmation(pending) => Ok(pending),
            _ => Err(SwiftvaultError::InvalidState {
                reason: "no wallet awaits confirmation".into(),
            }),
        }
    }

    /// Recovery phrase of the wallet being created.
    pub fn pending_phrase(&self) -> Result<&str> {
        Ok(self.pending()?.phrase())
    }

    /// Positions the user must answer for, in display order.
    pub fn challenge_positions(&self) -> Result<[usize; CHALLENGE_WORDS]> {
        Ok(self.pending()?.positions())
    }

    /// Checks the words entered for the challenge positions.
    ///
    /// On success the record becomes `Active` and the session starts.
    /// A wrong answer keeps the challenge while attempts remain; the
    /// last wrong answer deletes the record and leaves the pending
    /// state. Both failures return `PhraseVerificationFailed`.
    pub fn confirm_phrase(&mut self, words: &[&str]) -> Result<WalletSession> {
        let pending = match std::mem::replace(&mut self.state, SessionState::NoWallet) {
            SessionState::AwaitingConfirmation(pending) => pending,
            other => {
                self.state = other;
                return Err(SwiftvaultError::InvalidState {
                    reason: "no wallet awaits confirmation".into(),
                });
            }
        };
        let public_key = pending.public_key();

        match pending.submit(words) {
            Confirmation::Verified(keypair) => {
                let mut record = self
                    .repo
                    .get(&public_key)?
                    .ok_or_else(|| SwiftvaultError::WalletNotFound {
                        reason: format!("pending wallet {public_key} vanished from storage"),
                    })?;
                record.status = RecordStatus::Active;
                self.repo.put(&public_key, &record)?;
                tracing::info!(public_key = %public_key, "recovery phrase confirmed");
                self.activate(keypair)
            }
            Confirmation::Retry(pending) => {
                tracing::warn!(
                    public_key = %public_key,
                    attempts_left = pending.attempts_left(),
                    "recovery phrase confirmation failed"
                );
                self.state = SessionState::AwaitingConfirmation(pending);
                Err(SwiftvaultError::PhraseVerificationFailed)
            }
            Confirmation::Exhausted => {
                self.repo.remove(&public_key)?;
                tracing::warn!(public_key = %public_key, "confirmation attempts exhausted, wallet discarded");
                let prefs = self.repo.load_prefs()?;
                self.settle(prefs)?;
                Err(SwiftvaultError::PhraseVerificationFailed)
            }
        }
    }

    /// Discards the wallet being created.
    pub fn abandon_creation(&mut self) -> Result<SessionStatus> {
        let public_key = self.pending()?.public_key();
        self.state = SessionState::NoWallet;
        self.repo.remove(&public_key)?;
        tracing::info!(public_key = %public_key, "wallet creation abandoned");
        let prefs = self.repo.load_prefs()?;
        self.settle(prefs)
    }

    /// Imports a raw hex keypair (64 bytes) or secret seed (32 bytes)
    /// and seals it under `pin`. Imported wallets have no phrase, so
    /// there is nothing to confirm. Re-importing a stored wallet keeps
    /// its phrase digest, so phrase lookup still finds it.
    ///
    /// # Errors
    ///
    /// [`SwiftvaultError::MalformedKeyMaterial`] for bad input; no
    /// record is written.
    pub async fn import_private_key(&mut self, key_hex: &str, pin: Pin) -> Result<WalletSession> {
        self.ensure_idle("import a wallet")?;

        let keypair = Keypair::from_hex(key_hex)?;
        let public_key = keypair.public_key();
        let phrase = match self.repo.get(&public_key) {
            Ok(Some(existing)) => existing.phrase,
            _ => None,
        };
        let (keypair, entry) = self.seal(keypair, pin).await?;
        let record = VaultRecord::new(entry, RecordStatus::Active, self.network, phrase);
        self.repo.put(&public_key, &record)?;
        tracing::info!(public_key = %public_key, "wallet imported from private key");
        self.activate(keypair)
    }

    /// Rebuilds a wallet from its recovery phrase and seals it under a
    /// new PIN, replacing any stored record for the same key along with
    /// its failure counter.
    pub async fn recover_from_phrase(&mut self, phrase: &str, pin: Pin) -> Result<WalletSession> {
        self.ensure_idle("recover a wallet")?;

        let mnemonic = Mnemonic::parse(phrase)?;
        let known = self.lookup_by_phrase(mnemonic.as_str())?;
        let keypair = derive_keypair(&mnemonic)?;
        let public_key = keypair.public_key();
        let digest = PhraseDigest::new(mnemonic.as_str())?;
        drop(mnemonic);

        let (keypair, entry) = self.seal(keypair, pin).await?;
        let record = VaultRecord::new(entry, RecordStatus::Active, self.network, Some(digest));
        self.repo.put(&public_key, &record)?;
        tracing::info!(public_key = %public_key, replaced = known.is_some(), "wallet recovered from phrase");
        self.activate(keypair)
    }

    /// Finds the stored wallet created from `phrase`, without
    /// decrypting anything.
    ///
    /// # Errors
    ///
    /// [`SwiftvaultError::InvalidMnemonic`] if the phrase is invalid.
    pub fn lookup_by_phrase(&self, phrase: &str) -> Result<Option<PublicKey>> {
        let mnemonic = Mnemonic::parse(phrase)?;
        for id in self.repo.list_ids()? {
            let record = match self.repo.get(&id) {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => {
                    tracing::debug!(public_key = %id, error = %e, "skipping unreadable record");
                    continue;
                }
            };
            if record
                .phrase
                .as_ref()
                .is_some_and(|digest| digest.matches(mnemonic.as_str()))
            {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    // -----------------------------------------------------------------------
    // Lock / unlock
    // -----------------------------------------------------------------------

    /// Decrypts the selected wallet and starts a session. When the
    /// wallet is already active the PIN is still checked, and the
    /// existing session is returned.
    ///
    /// # Errors
    ///
    /// - [`SwiftvaultError::LockedOut`] during a cool-down, without
    ///   running the KDF.
    /// - [`SwiftvaultError::IncorrectPin`] on a wrong PIN or tampered
    ///   ciphertext; counts towards the lockout.
    /// - [`SwiftvaultError::VaultCorrupted`] on a damaged record.
    pub async fn unlock(&mut self, pin: Pin) -> Result<WalletSession> {
        let public_key = self.selected_wallet()?;
        let keypair = self.open(public_key, pin).await?;
        if let SessionState::Active(active) = &self.state {
            return Ok(active.session.clone());
        }
        self.activate(keypair)
    }

    /// Ends the session and zeroizes the keypair.
    pub fn logout(&mut self) {
        if let SessionState::Active(active) = &self.state {
            let public_key = active.session.public_key;
            self.state = SessionState::Locked { public_key };
            tracing::info!(public_key = %public_key, "session locked");
        }
    }

    // -----------------------------------------------------------------------
    // Signing
    // -----------------------------------------------------------------------

    /// Runs `f` with the session keypair.
    ///
    /// # Errors
    ///
    /// [`SwiftvaultError::WalletLocked`] unless `Active`.
    pub fn with_keypair<T>(&self, f: impl FnOnce(&Keypair) -> T) -> Result<T> {
        match &self.state {
            SessionState::Active(active) => Ok(f(&active.keypair)),
            _ => Err(SwiftvaultError::WalletLocked),
        }
    }

    /// Signs `message` with the session keypair.
    pub fn sign(&self, message: &[u8]) -> Result<Signature> {
        self.with_keypair(|kp| kp.sign(message))
    }

    /// Builds, signs and submits a transfer of `lamports` to `to`. Only
    /// the signed bytes reach the chain client.
    pub async fn send_transfer(
        &self,
        to: &PublicKey,
        lamports: u64,
    ) -> Result<TransactionSignature> {
        let from = match &self.state {
            SessionState::Active(active) => active.session.public_key,
            _ => return Err(SwiftvaultError::WalletLocked),
        };

        let blockhash = self.chain.latest_blockhash().await?;
        let tx = self.with_keypair(|kp| build_transfer(kp, to, lamports, &blockhash))??;
        let signature = self.chain.submit_transaction(&tx.serialize()).await?;
        tracing::info!(from = %from, to = %to, lamports, signature = %signature, "transfer submitted");
        Ok(signature)
    }

    // -----------------------------------------------------------------------
    // Chain reads
    // -----------------------------------------------------------------------

    /// Native balance of the selected wallet, in lamports.
    pub async fn balance(&self) -> Result<u64> {
        let public_key = self.selected_wallet()?;
        self.chain.get_balance(&public_key).await
    }

    /// Token accounts of the selected wallet.
    pub async fn token_accounts(&self) -> Result<Vec<TokenAccount>> {
        let public_key = self.selected_wallet()?;
        self.chain.get_token_accounts(&public_key).await
    }

    // -----------------------------------------------------------------------
    // Maintenance
    // -----------------------------------------------------------------------

    /// Returns the selected wallet's keypair as hex after checking
    /// `pin`. Subject to the same throttle as [`unlock`](Self::unlock).
    pub async fn export_private_key(&mut self, pin: Pin) -> Result<Zeroizing<String>> {
        let public_key = self.selected_wallet()?;
        let keypair = self.open(public_key, pin).await?;
        tracing::warn!(public_key = %public_key, "private key exported");
        Ok(keypair.to_hex())
    }

    /// Deletes the current wallet and the remembered preferences.
    /// Another stored wallet, if any, becomes the selected one.
    pub fn forget_wallet(&mut self) -> Result<SessionStatus> {
        let public_key = self.public_key().ok_or_else(|| SwiftvaultError::WalletNotFound {
            reason: "no wallet on this device".into(),
        })?;

        self.state = SessionState::NoWallet;
        self.repo.remove(&public_key)?;
        self.repo.clear_prefs()?;
        tracing::info!(public_key = %public_key, "wallet forgotten");
        self.settle(None)
    }

    /// Switches network and remembers the choice. The caller installs a
    /// matching client with [`set_chain_client`](Self::set_chain_client).
    pub fn set_network(&mut self, network: Network) -> Result<()> {
        self.network = network;
        if let SessionState::Active(active) = &mut self.state {
            active.session.network = network;
        }
        if let Ok(public_key) = self.selected_wallet() {
            self.remember(public_key)?;
        }
        tracing::info!(network = %network, "network selected");
        Ok(())
    }
}
