//! Linked library card domain model

use serde::{Deserialize, Serialize};

use super::secret::{non_empty, SecretBearing};

/// An additional library card linked to a patron account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryCard {
    pub id: i64,
    pub user_id: i64,
    pub card_name: String,
    pub catalog_username: Option<String>,
    #[serde(skip_serializing)]
    pub catalog_password: Option<String>,
    #[serde(skip_serializing)]
    pub catalog_password_enc: Option<String>,
}

impl LibraryCard {
    pub fn new(id: i64, user_id: i64, card_name: impl Into<String>) -> Self {
        Self {
            id,
            user_id,
            card_name: card_name.into(),
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
}

impl SecretBearing for LibraryCard {
    fn label(&self) -> String {
        format!("card '{}' (user {})", self.card_name, self.user_id)
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
