//! Persistence of vault records and session preferences.
//!
//! A [`VaultRepository`] stores one [`VaultRecord`] per public key plus a
//! single [`SessionPrefs`] document naming the last-used wallet and
//! network. Nothing stored here is secret in the clear: the private key
//! only exists inside the encrypted entry, and the recovery phrase only
//! as a salted digest.
//!
//! # File layout ([`JsonFileRepository`])
//!
//! ```text
//! <dir>/vaults/<base58 public key>.json
//! <dir>/session.json
//! ```
//!
//! Every write goes to a `.tmp` sibling first and is renamed into place,
//! so a crash never leaves a half-written record behind.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use swiftvault_crypto::hash::{phrase_hash, PHRASE_SALT_LEN};
use swiftvault_crypto::random::random_array;
use swiftvault_types::{Network, PublicKey, Result, SwiftvaultError, Timestamp};

use crate::serde_hex;
use crate::throttle::PinThrottle;
use crate::vault::EncryptedVaultEntry;

/// Record format version written by this crate.
pub const RECORD_VERSION: u32 = 1;

const VAULTS_DIR: &str = "vaults";
const SESSION_FILE: &str = "session.json";

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Lifecycle of a stored wallet.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordStatus {
    /// Created, recovery phrase not yet confirmed. Purged on restore.
    Unconfirmed,
    /// Usable wallet.
    Active,
}

/// Salted SHA-256 of a normalized recovery phrase, used to find a
/// wallet by its phrase without storing the phrase.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PhraseDigest {
    #[serde(with = "serde_hex::array")]
    salt: [u8; PHRASE_SALT_LEN],
    #[serde(with = "serde_hex::array")]
    hash: [u8; 32],
}

impl PhraseDigest {
    /// Digests an already normalized phrase under a fresh random salt.
    ///
    /// # Errors
    ///
    /// [`SwiftvaultError::EntropySourceUnavailable`] if no salt can be drawn.
    pub fn new(normalized_phrase: &str) -> Result<Self> {
        let salt: [u8; PHRASE_SALT_LEN] = random_array()?;
        let hash = phrase_hash(&salt, normalized_phrase);
        Ok(Self { salt, hash })
    }

    /// Constant-time check of a normalized phrase against the digest.
    pub fn matches(&self, normalized_phrase: &str) -> bool {
        let computed = phrase_hash(&self.salt, normalized_phrase);
        bool::from(computed.as_slice().ct_eq(self.hash.as_slice()))
    }
}

/// Everything persisted for one wallet.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultRecord {
    /// Format version, currently [`RECORD_VERSION`].
    pub version: u32,
    /// Whether the wallet finished creation.
    pub status: RecordStatus,
    /// Network the wallet was last used on.
    pub network: Network,
    /// When the record was first written.
    pub created_at: Timestamp,
    /// Encrypted private key.
    pub entry: EncryptedVaultEntry,
    /// Phrase digest. `None` for wallets imported from a raw key.
    #[serde(default)]
    pub phrase: Option<PhraseDigest>,
    /// Failed-PIN state.
    #[serde(default)]
    pub throttle: PinThrottle,
}

impl VaultRecord {
    /// Wraps a freshly sealed entry.
    pub fn new(
        entry: EncryptedVaultEntry,
        status: RecordStatus,
        network: Network,
        phrase: Option<PhraseDigest>,
    ) -> Self {
        Self {
            version: RECORD_VERSION,
            status,
            network,
            created_at: Timestamp::now(),
            entry,
            phrase,
            throttle: PinThrottle::default(),
        }
    }

    /// Public key the record is stored under.
    pub fn public_key(&self) -> &PublicKey {
        &self.entry.public_key
    }
}

/// Last-used wallet and network, restored at startup.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPrefs {
    /// Wallet to select.
    pub public_key: PublicKey,
    /// Network to talk to.
    pub network: Network,
}

// ---------------------------------------------------------------------------
// VaultRepository
// ---------------------------------------------------------------------------

/// Keyed storage for vault records and the session preferences.
pub trait VaultRepository: Send + Sync {
    /// Loads the record for `id`, if any.
    fn get(&self, id: &PublicKey) -> Result<Option<VaultRecord>>;

    /// Inserts or replaces the record for `id`.
    fn put(&self, id: &PublicKey, record: &VaultRecord) -> Result<()>;

    /// Deletes the record for `id`. Returns whether one existed.
    fn remove(&self, id: &PublicKey) -> Result<bool>;

    /// All stored public keys, in a stable order.
    fn list_ids(&self) -> Result<Vec<PublicKey>>;

    /// Loads the session preferences, if saved.
    fn load_prefs(&self) -> Result<Option<SessionPrefs>>;

    /// Replaces the session preferences.
    fn save_prefs(&self, prefs: &SessionPrefs) -> Result<()>;

    /// Forgets the session preferences.
    fn clear_prefs(&self) -> Result<()>;
}

impl<T: VaultRepository + ?Sized> VaultRepository for std::sync::Arc<T> {
    fn get(&self, id: &PublicKey) -> Result<Option<VaultRecord>> {
        (**self).get(id)
    }

    fn put(&self, id: &PublicKey, record: &VaultRecord) -> Result<()> {
        (**self).put(id, record)
    }

    fn remove(&self, id: &PublicKey) -> Result<bool> {
        (**self).remove(id)
    }

    fn list_ids(&self) -> Result<Vec<PublicKey>> {
        (**self).list_ids()
    }

    fn load_prefs(&self) -> Result<Option<SessionPrefs>> {
        (**self).load_prefs()
    }

    fn save_prefs(&self, prefs: &SessionPrefs) -> Result<()> {
        (**self).save_prefs(prefs)
    }

    fn clear_prefs(&self) -> Result<()> {
        (**self).clear_prefs()
    }
}

fn check_key(id: &PublicKey, record: &VaultRecord) -> Result<()> {
    if record.public_key() != id {
        return Err(SwiftvaultError::StorageError {
            reason: format!("record for {} stored under {id}", record.public_key()),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// MemoryRepository
// ---------------------------------------------------------------------------

/// In-process repository. Contents are lost when dropped.
#[derive(Default)]
pub struct MemoryRepository {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    records: BTreeMap<PublicKey, VaultRecord>,
    prefs: Option<SessionPrefs>,
}

impl MemoryRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryInner>> {
        self.inner.lock().map_err(|_| SwiftvaultError::StorageError {
            reason: "repository lock poisoned".into(),
        })
    }
}

impl VaultRepository for MemoryRepository {
    fn get(&self, id: &PublicKey) -> Result<Option<VaultRecord>> {
        Ok(self.lock()?.records.get(id).cloned())
    }

    fn put(&self, id: &PublicKey, record: &VaultRecord) -> Result<()> {
        check_key(id, record)?;
        self.lock()?.records.insert(*id, record.clone());
        Ok(())
    }

    fn remove(&self, id: &PublicKey) -> Result<bool> {
        Ok(self.lock()?.records.remove(id).is_some())
    }

    fn list_ids(&self) -> Result<Vec<PublicKey>> {
        Ok(self.lock()?.records.keys().copied().collect())
    }

    fn load_prefs(&self) -> Result<Option<SessionPrefs>> {
        Ok(self.lock()?.prefs)
    }

    fn save_prefs(&self, prefs: &SessionPrefs) -> Result<()> {
        self.lock()?.prefs = Some(*prefs);
        Ok(())
    }

    fn clear_prefs(&self) -> Result<()> {
        self.lock()?.prefs = None;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JsonFileRepository
// ---------------------------------------------------------------------------

/// One pretty-printed JSON file per wallet under a data directory.
pub struct JsonFileRepository {
    dir: PathBuf,
}

impl JsonFileRepository {
    /// Opens (creating if needed) the repository rooted at `dir`.
    ///
    /// # Errors
    ///
    /// [`SwiftvaultError::StorageError`] if the directories cannot be
    /// created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let vaults = dir.join(VAULTS_DIR);
        std::fs::create_dir_all(&vaults).map_err(|e| SwiftvaultError::StorageError {
            reason: format!("failed to create {}: {e}", vaults.display()),
        })?;
        Ok(Self { dir })
    }

    /// Root data directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &PublicKey) -> PathBuf {
        self.dir.join(VAULTS_DIR).join(format!("{id}.json"))
    }

    fn prefs_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, contents).map_err(|e| SwiftvaultError::StorageError {
        reason: format!("failed to write {}: {e}", tmp_path.display()),
    })?;
    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        SwiftvaultError::StorageError {
            reason: format!("failed to rename into {}: {e}", path.display()),
        }
    })
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(json) => Ok(Some(json)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SwiftvaultError::StorageError {
            reason: format!("failed to read {}: {e}", path.display()),
        }),
    }
}

impl VaultRepository for JsonFileRepository {
    fn get(&self, id: &PublicKey) -> Result<Option<VaultRecord>> {
        let path = self.record_path(id);
        let Some(json) = read_optional(&path)? else {
            return Ok(None);
        };

        let record: VaultRecord =
            serde_json::from_str(&json).map_err(|e| SwiftvaultError::VaultCorrupted {
                reason: format!("unreadable record {}: {e}", path.display()),
            })?;
        if record.version != RECORD_VERSION {
            return Err(SwiftvaultError::VaultCorrupted {
                reason: format!(
                    "unsupported record version {} (expected {RECORD_VERSION})",
                    record.version
                ),
            });
        }
        if record.public_key() != id {
            return Err(SwiftvaultError::VaultCorrupted {
                reason: format!("record {} names another public key", path.display()),
            });
        }
        Ok(Some(record))
    }

    fn put(&self, id: &PublicKey, record: &VaultRecord) -> Result<()> {
        check_key(id, record)?;
        let json = serde_json::to_string_pretty(record).map_err(|e| SwiftvaultError::StorageError {
            reason: format!("record serialization failed: {e}"),
        })?;
        let path = self.record_path(id);
        write_atomic(&path, json.as_bytes())?;
        tracing::debug!(public_key = %id, path = %path.display(), "vault record saved");
        Ok(())
    }

    fn remove(&self, id: &PublicKey) -> Result<bool> {
        match std::fs::remove_file(self.record_path(id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SwiftvaultError::StorageError {
                reason: format!("failed to delete record {id}: {e}"),
            }),
        }
    }

    fn list_ids(&self) -> Result<Vec<PublicKey>> {
        let vaults = self.dir.join(VAULTS_DIR);
        let entries = std::fs::read_dir(&vaults).map_err(|e| SwiftvaultError::StorageError {
            reason: format!("failed to list {}: {e}", vaults.display()),
        })?;

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| SwiftvaultError::StorageError {
                    reason: format!("failed to list {}: {e}", vaults.display()),
                })?
                .path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match stem.parse::<PublicKey>() {
                Ok(id) => ids.push(id),
                Err(_) => tracing::warn!(path = %path.display(), "ignoring unrecognised file in vault directory"),
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn load_prefs(&self) -> Result<Option<SessionPrefs>> {
        let path = self.prefs_path();
        let Some(json) = read_optional(&path)? else {
            return Ok(None);
        };
        match serde_json::from_str(&json) {
            Ok(prefs) => Ok(Some(prefs)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "discarding unreadable session preferences");
                Ok(None)
            }
        }
    }

    fn save_prefs(&self, prefs: &SessionPrefs) -> Result<()> {
        let json = serde_json::to_string_pretty(prefs).map_err(|e| SwiftvaultError::StorageError {
            reason: format!("session serialization failed: {e}"),
        })?;
        write_atomic(&self.prefs_path(), json.as_bytes())
    }

    fn clear_prefs(&self) -> Result<()> {
        match std::fs::remove_file(self.prefs_path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SwiftvaultError::StorageError {
                reason: format!("failed to delete session preferences: {e}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phrase_digest_matches_only_its_phrase() -> std::result::Result<(), SwiftvaultError> {
        let digest = PhraseDigest::new("abandon ability able")?;
        assert!(digest.matches("abandon ability able"));
        assert!(!digest.matches("abandon ability about"));
        Ok(())
    }

    #[test]
    fn phrase_digest_is_salted() -> std::result::Result<(), SwiftvaultError> {
        let a = PhraseDigest::new("same phrase")?;
        let b = PhraseDigest::new("same phrase")?;
        assert_ne!(a, b);
        Ok(())
    }

    #[test]
    fn memory_repository_prefs_lifecycle() -> std::result::Result<(), SwiftvaultError> {
        let repo = MemoryRepository::new();
        assert_eq!(repo.load_prefs()?, None);
        let prefs = SessionPrefs {
            public_key: PublicKey::from_bytes([1; 32]),
            network: Network::Testnet,
        };
        repo.save_prefs(&prefs)?;
        assert_eq!(repo.load_prefs()?, Some(prefs));
        repo.clear_prefs()?;
        assert_eq!(repo.load_prefs()?, None);
        Ok(())
    }
}
