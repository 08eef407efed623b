//! Status service - how stored catalog secrets are currently protected

use std::sync::Arc;

use serde::Serialize;

use crate::adapters::duckdb::{DuckDbRepository, SecretCounts};
use crate::domain::result::Result;
use crate::domain::EncryptionStatus;
use crate::ports::ConfigStore;

/// Status service for encryption summaries
pub struct StatusService {
    repository: Arc<DuckDbRepository>,
}

impl StatusService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// Get overall status summary
    ///
    /// Reports whether a key is on file but never the key itself.
    pub fn get_status(&self, config_store: &dyn ConfigStore) -> Result<StatusSummary> {
        let settings = config_store.encryption_settings()?;

        Ok(StatusSummary {
            encryption: EncryptionStatus::from_settings(&settings),
            accounts: self.repository.account_secret_counts()?,
            cards: self.repository.card_secret_counts()?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub encryption: EncryptionStatus,
    pub accounts: SecretCounts,
    pub cards: SecretCounts,
}

impl StatusSummary {
    /// Plaintext secrets left behind while encryption is enabled
    pub fn has_stray_plaintext(&self) -> bool {
        self.encryption.enabled && (self.accounts.plaintext > 0 || self.cards.plaintext > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryConfigStore;
    use crate::domain::{EncryptionSettings, PatronAccount};
    use tempfile::TempDir;

    #[test]
    fn test_status_counts_and_hides_key() {
        let temp_dir = TempDir::new().unwrap();
        let repo = DuckDbRepository::new(&temp_dir.path().join("test.duckdb")).unwrap();
        repo.ensure_schema().unwrap();
        repo.insert_account(&PatronAccount::new(1, "alice").with_catalog_login("1", "pw"))
            .unwrap();

        let config_store = MemoryConfigStore::new(EncryptionSettings {
            enabled: true,
            algorithm: Some("aes".to_string()),
            key: Some("k1".to_string()),
        });

        let summary = StatusService::new(Arc::new(repo))
            .get_status(&config_store)
            .unwrap();

        assert!(summary.encryption.enabled);
        assert!(summary.encryption.key_on_file);
        assert_eq!(summary.accounts.total, 1);
        assert_eq!(summary.accounts.plaintext, 1);
        assert_eq!(summary.cards.total, 0);
        assert!(summary.has_stray_plaintext());

        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("k1"));
    }
}
