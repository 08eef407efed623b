//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "authentication": {
//!     "encryptSecrets": true,
//!     "encryptionAlgorithm": "aes",
//!     "encryptionKey": "..."
//!   },
//!   "keyDerivation": { "timeCost": 3, "memoryCost": 65536, "parallelism": 4 }
//! }
//! ```
//! Sections other than these are ignored here and preserved by
//! [`JsonConfigStore`](crate::adapters::settings::JsonConfigStore) when it
//! rewrites the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::{Argon2Params, EncryptionSettings};

/// Settings file name inside the data directory
pub const SETTINGS_FILE: &str = "settings.json";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    authentication: AuthenticationSettings,
    #[serde(default)]
    key_derivation: Option<KeyDerivationSettings>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthenticationSettings {
    #[serde(default)]
    encrypt_secrets: bool,
    #[serde(default)]
    encryption_algorithm: Option<String>,
    #[serde(default)]
    encryption_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyDerivationSettings {
    time_cost: Option<u32>,
    memory_cost: Option<u32>,
    parallelism: Option<u32>,
}

impl KeyDerivationSettings {
    fn to_params(&self) -> Argon2Params {
        let defaults = Argon2Params::default();
        Argon2Params {
            time_cost: self.time_cost.unwrap_or(defaults.time_cost),
            memory_cost: self.memory_cost.unwrap_or(defaults.memory_cost),
            parallelism: self.parallelism.unwrap_or(defaults.parallelism),
        }
    }
}

/// Shelfkey configuration (typed view of settings.json)
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub encryption: EncryptionSettings,
    pub key_derivation: Argon2Params,
}

impl Config {
    /// Path of the settings file for a data directory
    pub fn settings_path(data_dir: &Path) -> PathBuf {
        data_dir.join(SETTINGS_FILE)
    }

    /// Load config from the data directory
    ///
    /// A missing file means defaults (encryption disabled). A file that
    /// exists but cannot be parsed is an error: treating it as empty would
    /// misreport the secrets as plaintext.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let settings_path = Self::settings_path(data_dir);

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)
                .with_context(|| format!("Failed to read {}", settings_path.display()))?;
            if content.trim().is_empty() {
                SettingsFile::default()
            } else {
                serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse {}", settings_path.display()))?
            }
        } else {
            SettingsFile::default()
        };

        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: SettingsFile) -> Self {
        Self {
            encryption: EncryptionSettings {
                enabled: raw.authentication.encrypt_secrets,
                algorithm: raw.authentication.encryption_algorithm,
                key: raw.authentication.encryption_key,
            },
            key_derivation: raw
                .key_derivation
                .map(|kd| kd.to_params())
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert!(!config.encryption.enabled);
        assert!(config.encryption.key.is_none());
        assert_eq!(config.key_derivation, Argon2Params::default());
    }

    #[test]
    fn test_load_authentication_section() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{
                "authentication": {
                    "encryptSecrets": true,
                    "encryptionAlgorithm": "chacha20",
                    "encryptionKey": "k0",
                    "hideLogin": false
                },
                "keyDerivation": { "memoryCost": 1024 },
                "catalog": { "driver": "Demo" }
            }"#,
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert!(config.encryption.enabled);
        assert_eq!(config.encryption.algorithm.as_deref(), Some("chacha20"));
        assert_eq!(config.encryption.key.as_deref(), Some("k0"));
        assert_eq!(config.key_derivation.memory_cost, 1024);
        assert_eq!(config.key_derivation.time_cost, Argon2Params::default().time_cost);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "{ not json").unwrap();
        assert!(Config::load(dir.path()).is_err());
    }
}
