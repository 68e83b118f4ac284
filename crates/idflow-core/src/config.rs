//! Manager configuration file support
//!
//! Loads configuration from `<idflow dir>/config.toml`. A missing or invalid
//! file yields defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default address of the authentication service.
pub const DEFAULT_REMOTE_ADDRESS: &str = "layer1://localhost:3036";

/// What sign-in does when an identifier has no registered identity provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownProviderPolicy {
    /// Resolve the sign-in to a failure naming the provider key.
    #[default]
    Fail,
    /// Contribute no token for that identifier and continue.
    Skip,
}

/// How load and save failures of the profile document are reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceMode {
    /// Log and degrade: failed loads start empty, failed saves are not fatal.
    #[default]
    Lenient,
    /// Surface every load and save failure to the caller.
    Strict,
}

/// Configuration for the profile manager
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Address handed to `RemoteClient::connect`
    #[serde(default = "default_remote_address")]
    pub remote_address: String,
    #[serde(default)]
    pub unknown_provider: UnknownProviderPolicy,
    #[serde(default)]
    pub persistence: PersistenceMode,
    /// Override for the sealed profile document location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiles_path: Option<PathBuf>,
}

fn default_remote_address() -> String {
    DEFAULT_REMOTE_ADDRESS.to_string()
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            remote_address: default_remote_address(),
            unknown_provider: UnknownProviderPolicy::default(),
            persistence: PersistenceMode::default(),
            profiles_path: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Also write a daily-rolling log file under `<idflow dir>/logs`
    #[serde(default)]
    pub file: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: false,
        }
    }
}

/// Top-level `config.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdflowConfig {
    #[serde(default)]
    pub manager: ManagerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl IdflowConfig {
    /// Load configuration from the default path
    pub fn load() -> Self {
        Self::load_from_path(Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: Option<PathBuf>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::read(&path) {
            Ok(config) => config,
            Err(error) => {
                warn!(path = %path.display(), error = %error, "Ignoring invalid config file");
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// `<idflow dir>/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        idflow_storage::paths::config_path().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = IdflowConfig::default();
        assert_eq!(config.manager.remote_address, "layer1://localhost:3036");
        assert_eq!(config.manager.unknown_provider, UnknownProviderPolicy::Fail);
        assert_eq!(config.manager.persistence, PersistenceMode::Lenient);
        assert!(config.manager.profiles_path.is_none());
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.file);
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = IdflowConfig::load_from_path(Some(temp_dir.path().join("config.toml")));
        assert_eq!(config.manager.remote_address, DEFAULT_REMOTE_ADDRESS);
    }

    #[test]
    fn test_load_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[manager]
unknown_provider = "skip"
persistence = "strict"

[logging]
file = true
"#,
        )
        .unwrap();

        let config = IdflowConfig::load_from_path(Some(path));
        assert_eq!(config.manager.unknown_provider, UnknownProviderPolicy::Skip);
        assert_eq!(config.manager.persistence, PersistenceMode::Strict);
        assert_eq!(config.manager.remote_address, DEFAULT_REMOTE_ADDRESS);
        assert!(config.logging.file);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "manager = [not toml").unwrap();

        let config = IdflowConfig::load_from_path(Some(path));
        assert_eq!(config.manager.persistence, PersistenceMode::Lenient);
    }

    #[test]
    fn test_profiles_path_override() {
        let config: IdflowConfig = toml::from_str(
            r#"
[manager]
remote_address = "layer1://auth.corp:4000"
profiles_path = "/tmp/profiles.json"
"#,
        )
        .unwrap();

        assert_eq!(config.manager.remote_address, "layer1://auth.corp:4000");
        assert_eq!(
            config.manager.profiles_path,
            Some(PathBuf::from("/tmp/profiles.json"))
        );
    }
}
