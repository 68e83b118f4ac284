//! Path utilities for idflow directory resolution.

use crate::error::{Result, StorageError};
use std::path::PathBuf;

const IDFLOW_DIR: &str = ".idflow";
const PROFILES_FILE: &str = "profiles.json";
const MASTER_KEY_FILE: &str = "master.key";
const CONFIG_FILE: &str = "config.toml";
const LOGS_DIR: &str = "logs";

/// Environment variable to override the idflow directory.
pub const IDFLOW_DIR_ENV: &str = "IDFLOW_DIR";

/// Resolve the idflow data directory.
/// Priority: IDFLOW_DIR env var > ~/.idflow/
pub fn resolve_idflow_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(IDFLOW_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|h| h.join(IDFLOW_DIR))
        .ok_or(StorageError::HomeDirUnavailable)
}

/// Ensure the idflow directory exists and return its path.
pub fn ensure_idflow_dir() -> Result<PathBuf> {
    let dir = resolve_idflow_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Get the sealed profile document path: ~/.idflow/profiles.json
pub fn profiles_path() -> Result<PathBuf> {
    Ok(resolve_idflow_dir()?.join(PROFILES_FILE))
}

/// Get the master key path: ~/.idflow/master.key
pub fn master_key_path() -> Result<PathBuf> {
    Ok(resolve_idflow_dir()?.join(MASTER_KEY_FILE))
}

/// Get the config file path: ~/.idflow/config.toml
pub fn config_path() -> Result<PathBuf> {
    Ok(resolve_idflow_dir()?.join(CONFIG_FILE))
}

/// Get the logs directory: ~/.idflow/logs/
pub fn logs_dir() -> Result<PathBuf> {
    let dir = resolve_idflow_dir()?.join(LOGS_DIR);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
