//! Patron account domain model

use serde::{Deserialize, Serialize};

use super::secret::{non_empty, SecretBearing};

/// A patron account with catalog (ILS) login credentials
///
/// `catalog_password` and `catalog_password_enc` are mutually exclusive:
/// which one is populated depends on whether encryption was enabled when the
/// credentials were last saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatronAccount {
    pub id: i64,
    pub username: String,
    pub catalog_username: Option<String>,
    #[serde(skip_serializing)]
    pub catalog_password: Option<String>,
    #[serde(skip_serializing)]
    pub catalog_password_enc: Option<String>,
}

impl PatronAccount {
    /// Create an account without catalog credentials
    pub fn new(id: i64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            catalog_username: None,
            catalog_password: None,
            catalog_password_enc: None,
        }
    }

    /// Attach plaintext catalog credentials
    pub fn with_catalog_login(
        mut self,
        catalog_username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.catalog_username = Some(catalog_username.into());
        self.catalog_password = Some(password.into());
        self.catalog_password_enc = None;
        self
    }

    /// Validate account data
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.username.trim().is_empty() {
            return Err("username cannot be empty");
        }
        if non_empty(&self.catalog_password).is_some()
            && non_empty(&self.catalog_password_enc).is_some()
        {
            return Err("catalog password stored both in plaintext and encrypted");
        }
        Ok(())
    }
}

impl SecretBearing for PatronAccount {
    fn label(&self) -> String {
        format!("user '{}'", self.username)
    }

    fn plaintext_secret(&self) -> Option<&str> {
        non_empty(&self.catalog_password)
    }

    fn set_plaintext_secret(&mut self, value: Option<String>) {
        self.catalog_password = value;
    }

    fn encrypted_secret(&self) -> Option<&str> {
        non_empty(&self.catalog_password_enc)
    }

    fn set_encrypted_secret(&mut self, value: Option<String>) {
        self.catalog_password_enc = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_validation() {
        let mut account = PatronAccount::new(1, "reader").with_catalog_login("1234", "pw");
        assert!(account.validate().is_ok());

        account.catalog_password_enc = Some("blob".to_string());
        assert!(account.validate().is_err());

        account.username = " ".to_string();
        assert!(account.validate().is_err());
    }

    #[test]
    fn test_empty_fields_are_absent() {
        let mut account = PatronAccount::new(1, "reader");
        account.catalog_password = Some(String::new());
        account.catalog_password_enc = Some(String::new());
        assert!(account.plaintext_secret().is_none());
        assert!(account.encrypted_secret().is_none());
    }

    #[test]
    fn test_serialization_skips_secrets() {
        let account = PatronAccount::new(7, "reader").with_catalog_login("1234", "hunter2");
        let json = serde_json::to_string(&account).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(json.contains("reader"));
    }
}
