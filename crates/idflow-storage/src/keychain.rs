//! Master key sourcing.
//!
//! Priority: `IDFLOW_MASTER_KEY` (base64) > macOS Keychain (`keychain` feature) >
//! `master.key` file, created on first use and readable only by its owner.
//!
//! Only the macOS keyring backend is enabled; on other platforms `keyring`
//! would fall back to a per-process mock store, so the key file is used.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::encryption::{KEY_SIZE, ProfileCipher};
use crate::error::{Result, StorageError};

/// Environment variable carrying a base64-encoded 32-byte master key.
pub const MASTER_KEY_ENV: &str = "IDFLOW_MASTER_KEY";

#[cfg(all(feature = "keychain", target_os = "macos"))]
const KEYRING_SERVICE: &str = "idflow";
#[cfg(all(feature = "keychain", target_os = "macos"))]
const KEYRING_ACCOUNT: &str = "profiles-master-key";

/// Resolve the master key, creating and persisting one if none exists yet.
pub fn get_or_create_master_key(key_path: &Path) -> Result<[u8; KEY_SIZE]> {
    if let Some(key) = master_key_from_env()? {
        debug!("Using master key from environment");
        return Ok(key);
    }

    #[cfg(all(feature = "keychain", target_os = "macos"))]
    {
        match master_key_from_keyring() {
            Ok(key) => return Ok(key),
            Err(error) => {
                tracing::warn!(%error, "OS keyring unavailable, falling back to key file");
            }
        }
    }

    master_key_from_file(key_path)
}

fn master_key_from_env() -> Result<Option<[u8; KEY_SIZE]>> {
    match std::env::var(MASTER_KEY_ENV) {
        Ok(value) if !value.trim().is_empty() => decode_key(value.trim()).map(Some),
        _ => Ok(None),
    }
}

fn decode_key(encoded: &str) -> Result<[u8; KEY_SIZE]> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|err| StorageError::MasterKey(format!("Master key is not valid base64: {err}")))?;
    to_key(&bytes)
}

fn to_key(bytes: &[u8]) -> Result<[u8; KEY_SIZE]> {
    if bytes.len() != KEY_SIZE {
        return Err(StorageError::MasterKey(format!(
            "Master key must be {KEY_SIZE} bytes, got {}",
            bytes.len()
        )));
    }
    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(bytes);
    Ok(key)
}

#[cfg(all(feature = "keychain", target_os = "macos"))]
fn master_key_from_keyring() -> Result<[u8; KEY_SIZE]> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_ACCOUNT)
        .map_err(|err| StorageError::MasterKey(format!("Failed to access keyring: {err}")))?;

    match entry.get_password() {
        Ok(encoded) => decode_key(&encoded),
        Err(keyring::Error::NoEntry) => {
            let key = ProfileCipher::generate_key();
            entry
                .set_password(&STANDARD.encode(key))
                .map_err(|err| StorageError::MasterKey(format!("Failed to store key: {err}")))?;
            info!("Created master key in OS keyring");
            Ok(key)
        }
        Err(err) => Err(StorageError::MasterKey(format!(
            "Failed to read keyring entry: {err}"
        ))),
    }
}

fn master_key_from_file(key_path: &Path) -> Result<[u8; KEY_SIZE]> {
    if key_path.exists() {
        let bytes = std::fs::read(key_path)?;
        return to_key(&bytes);
    }

    if let Some(parent) = key_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let key = ProfileCipher::generate_key();
    let mut file = owner_only_file(key_path)?;
    file.write_all(&key)?;
    file.sync_all()?;

    info!(path = %key_path.display(), "Created master key file");
    Ok(key)
}

#[cfg(unix)]
fn owner_only_file(path: &Path) -> std::io::Result<std::fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn owner_only_file(path: &Path) -> std::io::Result<std::fs::File> {
    std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
}
