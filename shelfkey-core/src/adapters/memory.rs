//! In-memory adapters
//!
//! Stand-ins for the settings file and the record tables. They count calls
//! and can be told to fail, which makes the ordering guarantees of a rotation
//! observable without touching disk.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};

use serde_json::Value as JsonValue;

use crate::domain::result::{Error, Result};
use crate::domain::{EncryptionSettings, SecretBearing};
use crate::ports::{
    ConfigStore, RecordStore, AUTHENTICATION_SECTION, ENCRYPTION_ALGORITHM_KEY, ENCRYPTION_KEY_KEY,
    ENCRYPT_SECRETS_KEY,
};

/// Configuration store backed by a map
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    settings: RefCell<EncryptionSettings>,
    sections: RefCell<BTreeMap<String, BTreeMap<String, JsonValue>>>,
    fail_writes: Cell<bool>,
    write_count: Cell<usize>,
}

impl MemoryConfigStore {
    pub fn new(settings: EncryptionSettings) -> Self {
        Self {
            settings: RefCell::new(settings),
            ..Self::default()
        }
    }

    /// Make every subsequent `write_section` fail
    pub fn failing_writes(self) -> Self {
        self.fail_writes.set(true);
        self
    }

    /// Number of successful section writes
    pub fn write_count(&self) -> usize {
        self.write_count.get()
    }

    /// Values written to a section so far
    pub fn section(&self, name: &str) -> Option<BTreeMap<String, JsonValue>> {
        self.sections.borrow().get(name).cloned()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn encryption_settings(&self) -> Result<EncryptionSettings> {
        Ok(self.settings.borrow().clone())
    }

    fn write_section(&self, section: &str, values: &BTreeMap<String, JsonValue>) -> Result<()> {
        if self.fail_writes.get() {
            return Err(Error::ConfigWrite("simulated write failure".to_string()));
        }

        let mut sections = self.sections.borrow_mut();
        let entry = sections.entry(section.to_string()).or_default();
        for (key, value) in values {
            entry.insert(key.clone(), value.clone());
        }

        if section == AUTHENTICATION_SECTION {
            let mut settings = self.settings.borrow_mut();
            if let Some(enabled) = values.get(ENCRYPT_SECRETS_KEY).and_then(JsonValue::as_bool) {
                settings.enabled = enabled;
            }
            if let Some(algorithm) = values
                .get(ENCRYPTION_ALGORITHM_KEY)
                .and_then(JsonValue::as_str)
            {
                settings.algorithm = Some(algorithm.to_string());
            }
            if let Some(key) = values.get(ENCRYPTION_KEY_KEY).and_then(JsonValue::as_str) {
                settings.key = Some(key.to_string());
            }
        }

        self.write_count.set(self.write_count.get() + 1);
        Ok(())
    }
}

/// Record store backed by a vector, matched on record labels
#[derive(Debug)]
pub struct MemoryRecordStore<R> {
    records: RefCell<Vec<R>>,
    failing_labels: HashSet<String>,
    fail_listing: bool,
    list_calls: Cell<usize>,
    persist_calls: Cell<usize>,
}

impl<R: SecretBearing + Clone> MemoryRecordStore<R> {
    pub fn new(records: Vec<R>) -> Self {
        Self {
            records: RefCell::new(records),
            failing_labels: HashSet::new(),
            fail_listing: false,
            list_calls: Cell::new(0),
            persist_calls: Cell::new(0),
        }
    }

    /// Make `persist` fail for the record with this label
    pub fn fail_persist_for(mut self, label: impl Into<String>) -> Self {
        self.failing_labels.insert(label.into());
        self
    }

    /// Make `list_all` fail
    pub fn failing_list(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    /// Current contents
    pub fn records(&self) -> Vec<R> {
        self.records.borrow().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.get()
    }

    pub fn persist_calls(&self) -> usize {
        self.persist_calls.get()
    }
}

impl<R: SecretBearing + Clone> RecordStore for MemoryRecordStore<R> {
    type Record = R;

    fn list_all(&self) -> Result<Vec<R>> {
        self.list_calls.set(self.list_calls.get() + 1);
        if self.fail_listing {
            return Err(Error::database("simulated listing failure"));
        }
        Ok(self.records.borrow().clone())
    }

    fn persist(&self, record: &R) -> Result<()> {
        self.persist_calls.set(self.persist_calls.get() + 1);

        let label = record.label();
        if self.failing_labels.contains(&label) {
            return Err(Error::database(format!("simulated persist failure for {}", label)));
        }

        let mut records = self.records.borrow_mut();
        match records.iter_mut().find(|r| r.label() == label) {
            Some(slot) => {
                *slot = record.clone();
                Ok(())
            }
            None => Err(Error::not_found(label)),
        }
    }
}
