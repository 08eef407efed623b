//! Key rotation service - re-encrypts stored catalog secrets
//!
//! A run moves through four steps in a fixed order:
//!
//! 1. compare the requested parameters with those on file
//! 2. build the old and new ciphers
//! 3. persist the new directives to configuration
//! 4. rotate every account record, then every card record
//!
//! Steps 1-3 have no effect on the record store, and any error they raise
//! aborts the run. Step 4 never aborts: each record is rotated and persisted
//! on its own, failures are collected into the report, and records rotated
//! earlier stay rotated.

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;
use zeroize::Zeroizing;

use crate::domain::result::{Error, Result};
use crate::domain::{
    EncryptionSettings, EncryptionSpec, PlanDecision, RecordFailure, RecordKind, RotationOutcome,
    RotationPlan, RotationReport, SecretBearing,
};
use crate::ports::{
    Cipher, CipherFactory, ConfigStore, RecordStore, RotationProgress, AUTHENTICATION_SECTION,
    ENCRYPTION_ALGORITHM_KEY, ENCRYPTION_KEY_KEY, ENCRYPT_SECRETS_KEY,
};

/// Parameters supplied by the operator
#[derive(Debug, Clone)]
pub struct RotationRequest {
    /// New algorithm name
    pub algorithm: String,
    /// New key; defaults to the key on file
    pub key: Option<String>,
}

impl RotationRequest {
    pub fn new(algorithm: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            key: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// Ciphers for both sides of a rotation
///
/// `old` is absent when stored secrets are currently plaintext.
pub struct CipherPair {
    pub old: Option<Box<dyn Cipher>>,
    pub new: Box<dyn Cipher>,
}

/// Compare the requested parameters with the settings on file
///
/// Pure: reads nothing but its arguments.
pub fn determine_plan(
    settings: &EncryptionSettings,
    request: &RotationRequest,
) -> Result<PlanDecision> {
    if request.algorithm.trim().is_empty() {
        return Err(Error::validation("algorithm name cannot be empty"));
    }

    let old = settings.current_spec();

    // The key on file is the fallback even when encryption is disabled
    let key = request
        .key
        .as_deref()
        .filter(|k| !k.is_empty())
        .or_else(|| settings.key_on_file())
        .ok_or(Error::MissingKey)?;

    let new = EncryptionSpec::new(&request.algorithm, key);
    if old == new {
        return Ok(PlanDecision::NoChange);
    }

    Ok(PlanDecision::Rotate(RotationPlan { old, new }))
}

/// Re-encrypt one record and persist it through its store
///
/// The record is neither modified nor persisted when its secret cannot be
/// decrypted or re-encrypted.
pub fn rotate_record<S: RecordStore>(
    store: &S,
    record: &mut S::Record,
    ciphers: &CipherPair,
) -> Result<()> {
    let sealed = (ciphers.old.as_deref(), record.encrypted_secret());
    let plaintext: Option<Zeroizing<String>> = match sealed {
        (Some(old), Some(blob)) => Some(Zeroizing::new(old.decrypt(blob)?)),
        _ => record
            .plaintext_secret()
            .map(|p| Zeroizing::new(p.to_string())),
    };

    let encrypted = plaintext
        .as_deref()
        .map(|p| ciphers.new.encrypt(p))
        .transpose()?;

    record.set_plaintext_secret(None);
    record.set_encrypted_secret(encrypted);

    store.persist(record)
}

/// Rotate every account record, then every card record
///
/// The account phase is always announced to `progress`; the card phase only
/// when there is at least one card.
pub fn rotate_all<A, C>(
    accounts: &A,
    cards: &C,
    ciphers: &CipherPair,
    progress: &mut dyn RotationProgress,
) -> RotationReport
where
    A: RecordStore,
    C: RecordStore,
{
    let mut report = RotationReport::default();
    rotate_collection(RecordKind::Account, accounts, ciphers, true, &mut report, progress);
    rotate_collection(RecordKind::Card, cards, ciphers, false, &mut report, progress);
    report
}

fn rotate_collection<S: RecordStore>(
    kind: RecordKind,
    store: &S,
    ciphers: &CipherPair,
    announce_empty: bool,
    report: &mut RotationReport,
    progress: &mut dyn RotationProgress,
) {
    let records = match store.list_all() {
        Ok(records) => records,
        Err(e) => {
            let label = format!("all {}", kind.plural());
            progress.record_failed(kind, &label, &e);
            report.failures.push(RecordFailure {
                kind,
                label,
                error: e.to_string(),
            });
            return;
        }
    };

    if announce_empty || !records.is_empty() {
        progress.phase_started(kind, records.len());
    }

    for mut record in records {
        report.counts_mut(kind).processed += 1;
        let label = record.label();
        match rotate_record(store, &mut record, ciphers) {
            Ok(()) => {
                report.counts_mut(kind).rotated += 1;
                progress.record_rotated(kind, &label);
            }
            Err(e) => {
                progress.record_failed(kind, &label, &e);
                report.failures.push(RecordFailure {
                    kind,
                    label,
                    error: e.to_string(),
                });
            }
        }
    }

    progress.phase_finished(kind);
}

/// Orchestrates a complete rotation against the configuration store
pub struct KeyRotationService<'a> {
    config_store: &'a dyn ConfigStore,
    cipher_factory: &'a dyn CipherFactory,
}

impl<'a> KeyRotationService<'a> {
    pub fn new(config_store: &'a dyn ConfigStore, cipher_factory: &'a dyn CipherFactory) -> Self {
        Self {
            config_store,
            cipher_factory,
        }
    }

    /// Decide what a request would change, without side effects
    pub fn plan(&self, request: &RotationRequest) -> Result<PlanDecision> {
        let settings = self.config_store.encryption_settings()?;
        determine_plan(&settings, request)
    }

    /// Build both ciphers; nothing is written if either is unsupported
    pub fn build_ciphers(&self, plan: &RotationPlan) -> Result<CipherPair> {
        let old = match plan.old.key() {
            Some(key) if !plan.old.is_none() => {
                Some(self.cipher_factory.build(plan.old.algorithm(), key)?)
            }
            _ => None,
        };

        // Rotating back to plaintext is not supported
        if plan.new.is_none() {
            return Err(Error::UnsupportedAlgorithm(plan.new.algorithm().to_string()));
        }
        let new_key = plan.new.key().ok_or(Error::MissingKey)?;
        let new = self.cipher_factory.build(plan.new.algorithm(), new_key)?;

        Ok(CipherPair { old, new })
    }

    /// Write the new directives to configuration as one unit
    pub fn persist_config(&self, new: &EncryptionSpec) -> Result<()> {
        let key = new.key().ok_or(Error::MissingKey)?;

        let mut values = BTreeMap::new();
        values.insert(ENCRYPT_SECRETS_KEY.to_string(), JsonValue::Bool(true));
        values.insert(
            ENCRYPTION_ALGORITHM_KEY.to_string(),
            JsonValue::String(new.algorithm().to_string()),
        );
        values.insert(ENCRYPTION_KEY_KEY.to_string(), JsonValue::String(key.to_string()));

        self.config_store
            .write_section(AUTHENTICATION_SECTION, &values)
            .map_err(|e| match e {
                Error::ConfigWrite(_) => e,
                other => Error::ConfigWrite(other.to_string()),
            })
    }

    /// Plan, validate, persist configuration, then rotate both collections
    pub fn run<A, C>(
        &self,
        request: &RotationRequest,
        accounts: &A,
        cards: &C,
        progress: &mut dyn RotationProgress,
    ) -> Result<RotationOutcome>
    where
        A: RecordStore,
        C: RecordStore,
    {
        let plan = match self.plan(request)? {
            PlanDecision::NoChange => return Ok(RotationOutcome::NoChange),
            PlanDecision::Rotate(plan) => plan,
        };

        let ciphers = self.build_ciphers(&plan)?;
        self.persist_config(&plan.new)?;

        let report = rotate_all(accounts, cards, &ciphers, progress);
        Ok(RotationOutcome::Rotated { plan, report })
    }
}
