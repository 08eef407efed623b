//! settings.json configuration store
//!
//! Writes are atomic: the new document is written to a temp file in the same
//! directory and renamed over settings.json. An exclusive lock on
//! `settings.json.lock` serializes concurrent writers.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde_json::{Map, Value as JsonValue};

use crate::config::Config;
use crate::domain::result::{Error, Result};
use crate::domain::EncryptionSettings;
use crate::ports::ConfigStore;

const LOCK_FILE: &str = "settings.json.lock";

/// Configuration store backed by settings.json in the data directory
#[derive(Debug, Clone)]
pub struct JsonConfigStore {
    data_dir: PathBuf,
}

/// Exclusive lock held for the duration of a write
struct SettingsLock {
    file: File,
}

impl SettingsLock {
    fn acquire(data_dir: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(data_dir.join(LOCK_FILE))?;
        file.lock_exclusive()?;
        Ok(Self { file })
    }
}

impl Drop for SettingsLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

impl JsonConfigStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn settings_path(&self) -> PathBuf {
        Config::settings_path(&self.data_dir)
    }

    fn read_document(&self) -> Result<Map<String, JsonValue>> {
        let path = self.settings_path();
        if !path.exists() {
            return Ok(Map::new());
        }

        let content = fs::read_to_string(&path)?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        let value: JsonValue = serde_json::from_str(&content)?;
        match value {
            JsonValue::Object(map) => Ok(map),
            _ => Err(Error::Config(format!(
                "{} does not contain a JSON object",
                path.display()
            ))),
        }
    }

    fn write_document(&self, document: &Map<String, JsonValue>) -> Result<()> {
        let content = serde_json::to_string_pretty(document)?;

        let mut temp = tempfile::NamedTempFile::new_in(&self.data_dir)?;
        temp.write_all(content.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(self.settings_path()).map_err(|e| Error::Io(e.error))?;

        Ok(())
    }

    fn merge_section(&self, section: &str, values: &BTreeMap<String, JsonValue>) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        let _lock = SettingsLock::acquire(&self.data_dir)?;

        let mut document = self.read_document()?;
        let entry = document
            .entry(section.to_string())
            .or_insert_with(|| JsonValue::Object(Map::new()));
        let target = entry
            .as_object_mut()
            .ok_or_else(|| Error::Config(format!("section '{}' is not an object", section)))?;

        for (key, value) in values {
            target.insert(key.clone(), value.clone());
        }

        self.write_document(&document)
    }
}

impl ConfigStore for JsonConfigStore {
    fn encryption_settings(&self) -> Result<EncryptionSettings> {
        let config = Config::load(&self.data_dir).map_err(|e| Error::Config(format!("{:#}", e)))?;
        Ok(config.encryption)
    }

    fn write_section(&self, section: &str, values: &BTreeMap<String, JsonValue>) -> Result<()> {
        self.merge_section(section, values).map_err(|e| {
            Error::ConfigWrite(format!("{}: {}", self.settings_path().display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{
        AUTHENTICATION_SECTION, ENCRYPTION_ALGORITHM_KEY, ENCRYPTION_KEY_KEY, ENCRYPT_SECRETS_KEY,
    };
    use tempfile::tempdir;

    fn directives(algorithm: &str, key: &str) -> BTreeMap<String, JsonValue> {
        let mut values = BTreeMap::new();
        values.insert(ENCRYPT_SECRETS_KEY.to_string(), JsonValue::Bool(true));
        values.insert(ENCRYPTION_ALGORITHM_KEY.to_string(), JsonValue::from(algorithm));
        values.insert(ENCRYPTION_KEY_KEY.to_string(), JsonValue::from(key));
        values
    }

    #[test]
    fn test_write_creates_file() {
        let dir = tempdir().unwrap();
        let store = JsonConfigStore::new(dir.path());

        store
            .write_section(AUTHENTICATION_SECTION, &directives("aes", "k1"))
            .unwrap();

        let settings = store.encryption_settings().unwrap();
        assert!(settings.enabled);
        assert_eq!(settings.algorithm.as_deref(), Some("aes"));
        assert_eq!(settings.key.as_deref(), Some("k1"));
    }

    #[test]
    fn test_write_preserves_other_settings() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("settings.json"),
            r#"{
                "authentication": {"hideLogin": true, "encryptionKey": "old"},
                "catalog": {"driver": "Demo"}
            }"#,
        )
        .unwrap();
        let store = JsonConfigStore::new(dir.path());

        store
            .write_section(AUTHENTICATION_SECTION, &directives("chacha20", "new"))
            .unwrap();

        let content = fs::read_to_string(dir.path().join("settings.json")).unwrap();
        let doc: JsonValue = serde_json::from_str(&content).unwrap();
        assert_eq!(doc["catalog"]["driver"], "Demo");
        assert_eq!(doc["authentication"]["hideLogin"], true);
        assert_eq!(doc["authentication"]["encryptionKey"], "new");
        assert_eq!(doc["authentication"]["encryptionAlgorithm"], "chacha20");
    }

    #[test]
    fn test_write_failure_is_config_write_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("settings.json"), r#"{"authentication": 42}"#).unwrap();
        let store = JsonConfigStore::new(dir.path());

        let err = store
            .write_section(AUTHENTICATION_SECTION, &directives("aes", "k1"))
            .unwrap_err();

        assert!(matches!(err, Error::ConfigWrite(_)));
        // Original file untouched
        let content = fs::read_to_string(dir.path().join("settings.json")).unwrap();
        assert_eq!(content, r#"{"authentication": 42}"#);
    }

    #[test]
    fn test_unreadable_settings_is_config_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("settings.json"), "[").unwrap();
        let store = JsonConfigStore::new(dir.path());
        assert!(matches!(store.encryption_settings().unwrap_err(), Error::Config(_)));
    }
}
