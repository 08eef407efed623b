//! Configuration store port

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use crate::domain::result::Result;
use crate::domain::EncryptionSettings;

/// Settings section holding the encryption directives
pub const AUTHENTICATION_SECTION: &str = "authentication";

/// Directive keys inside [`AUTHENTICATION_SECTION`]
pub const ENCRYPT_SECRETS_KEY: &str = "encryptSecrets";
pub const ENCRYPTION_ALGORITHM_KEY: &str = "encryptionAlgorithm";
pub const ENCRYPTION_KEY_KEY: &str = "encryptionKey";

/// Durable configuration storage
pub trait ConfigStore {
    /// Snapshot of the encryption directives currently on file
    fn encryption_settings(&self) -> Result<EncryptionSettings>;

    /// Persist every value in `values` into `section` as a single unit
    ///
    /// Either all values are written or none are. Keys not named in `values`
    /// are left untouched.
    fn write_section(&self, section: &str, values: &BTreeMap<String, JsonValue>) -> Result<()>;
}
