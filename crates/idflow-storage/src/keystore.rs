//! Local-principal-bound sealing of persisted data.

use std::path::Path;

use crate::encryption::ProfileCipher;
use crate::error::Result;
use crate::keychain::get_or_create_master_key;
use crate::paths;

/// Seals data so that only the local principal that wrote it can read it back.
///
/// Implementations must use authenticated encryption: `open` fails on tampered
/// ciphertext, on a different key, or when `associated_data` differs from the
/// value used by `seal`.
pub trait LocalKeystore: Send + Sync {
    fn seal(&self, associated_data: &[u8], plaintext: &[u8]) -> Result<Vec<u8>>;

    fn open(&self, associated_data: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>>;
}

/// AES-256-GCM keystore keyed by the per-user master key.
pub struct MasterKeyKeystore {
    cipher: ProfileCipher,
}

impl MasterKeyKeystore {
    /// Use an explicit 32-byte key.
    pub fn from_key(master_key: &[u8]) -> Result<Self> {
        Ok(Self {
            cipher: ProfileCipher::new(master_key)?,
        })
    }

    /// Load (or create) the master key from `key_path`, honoring the
    /// environment and keyring overrides.
    pub fn load_from(key_path: &Path) -> Result<Self> {
        let key = get_or_create_master_key(key_path)?;
        Self::from_key(&key)
    }

    /// Load (or create) the master key at `~/.idflow/master.key`.
    pub fn load_default() -> Result<Self> {
        Self::load_from(&paths::master_key_path()?)
    }
}

impl LocalKeystore for MasterKeyKeystore {
    fn seal(&self, associated_data: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        self.cipher.encrypt(associated_data, plaintext)
    }

    fn open(&self, associated_data: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.cipher.decrypt(associated_data, ciphertext)
    }
}
