//! Encryption domain models

use serde::{Deserialize, Serialize};

/// Algorithm name meaning "secrets are stored in plaintext"
pub const NO_ENCRYPTION: &str = "none";

/// Algorithm assumed when settings enable encryption without naming one
pub const DEFAULT_ALGORITHM: &str = "aes";

/// Default Argon2id parameters
pub const DEFAULT_TIME_COST: u32 = 3;
pub const DEFAULT_MEMORY_COST: u32 = 65536; // 64 MiB
pub const DEFAULT_PARALLELISM: u32 = 4;

/// Argon2id parameters for deriving cipher keys from configured key strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argon2Params {
    pub time_cost: u32,
    pub memory_cost: u32,
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            time_cost: DEFAULT_TIME_COST,
            memory_cost: DEFAULT_MEMORY_COST,
            parallelism: DEFAULT_PARALLELISM,
        }
    }
}

/// One side of a rotation: an algorithm and the key it is used with
///
/// An `EncryptionSpec` for [`NO_ENCRYPTION`] never carries a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionSpec {
    algorithm: String,
    key: Option<String>,
}

impl EncryptionSpec {
    /// Secrets stored in plaintext
    pub fn none() -> Self {
        Self {
            algorithm: NO_ENCRYPTION.to_string(),
            key: None,
        }
    }

    /// A concrete algorithm/key pair
    ///
    /// Algorithm names are trimmed and lowercased.
    pub fn new(algorithm: impl AsRef<str>, key: impl Into<String>) -> Self {
        let algorithm = algorithm.as_ref().trim().to_ascii_lowercase();
        if algorithm == NO_ENCRYPTION {
            return Self::none();
        }
        Self {
            algorithm,
            key: Some(key.into()),
        }
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn is_none(&self) -> bool {
        self.algorithm == NO_ENCRYPTION
    }

    /// Human-readable description that never includes the key
    pub fn describe(&self) -> String {
        if self.is_none() {
            "none (plaintext)".to_string()
        } else {
            format!("{} (key on file)", self.algorithm)
        }
    }
}

/// Snapshot of the encryption directives read from configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncryptionSettings {
    pub enabled: bool,
    pub algorithm: Option<String>,
    pub key: Option<String>,
}

impl EncryptionSettings {
    /// Algorithm on file, falling back to [`DEFAULT_ALGORITHM`]
    pub fn algorithm_or_default(&self) -> &str {
        match self.algorithm.as_deref() {
            Some(a) if !a.trim().is_empty() => a,
            _ => DEFAULT_ALGORITHM,
        }
    }

    /// Key on file, ignoring empty values
    pub fn key_on_file(&self) -> Option<&str> {
        self.key.as_deref().filter(|k| !k.is_empty())
    }

    /// The `EncryptionSpec` currently protecting stored secrets
    ///
    /// Disabled encryption or a missing key both mean secrets are plaintext.
    pub fn current_spec(&self) -> EncryptionSpec {
        match (self.enabled, self.key_on_file()) {
            (true, Some(key)) => EncryptionSpec::new(self.algorithm_or_default(), key),
            _ => EncryptionSpec::none(),
        }
    }
}

/// Status of catalog secret encryption for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptionStatus {
    pub enabled: bool,
    pub algorithm: Option<String>,
    pub key_on_file: bool,
}

impl EncryptionStatus {
    pub fn from_settings(settings: &EncryptionSettings) -> Self {
        let spec = settings.current_spec();
        Self {
            enabled: !spec.is_none(),
            algorithm: (!spec.is_none()).then(|| spec.algorithm().to_string()),
            key_on_file: settings.key_on_file().is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_spec_carries_no_key() {
        let spec = EncryptionSpec::new("none", "ignored");
        assert!(spec.is_none());
        assert!(spec.key().is_none());
        assert_eq!(spec, EncryptionSpec::none());
    }

    #[test]
    fn test_disabled_settings_are_plaintext() {
        let settings = EncryptionSettings {
            enabled: false,
            algorithm: Some("aes".to_string()),
            key: Some("k0".to_string()),
        };
        assert!(settings.current_spec().is_none());
        assert_eq!(settings.key_on_file(), Some("k0"));
    }

    #[test]
    fn test_enabled_without_key_is_plaintext() {
        let settings = EncryptionSettings {
            enabled: true,
            algorithm: Some("aes".to_string()),
            key: Some(String::new()),
        };
        assert!(settings.current_spec().is_none());
    }

    #[test]
    fn test_missing_algorithm_uses_default() {
        let settings = EncryptionSettings {
            enabled: true,
            algorithm: None,
            key: Some("k0".to_string()),
        };
        assert_eq!(settings.current_spec(), EncryptionSpec::new(DEFAULT_ALGORITHM, "k0"));
    }

    #[test]
    fn test_algorithm_names_are_normalized() {
        let spec = EncryptionSpec::new(" AES ", "k1");
        assert_eq!(spec.algorithm(), "aes");
        assert_eq!(spec, EncryptionSpec::new("aes", "k1"));
    }

    #[test]
    fn test_describe_hides_key() {
        let spec = EncryptionSpec::new("chacha20", "super-secret");
        assert!(!spec.describe().contains("super-secret"));
    }

    #[test]
    fn test_encryption_status() {
        let status = EncryptionStatus::from_settings(&EncryptionSettings::default());
        assert!(!status.enabled);
        assert!(status.algorithm.is_none());
        assert!(!status.key_on_file);
    }
}
