//! Shelfkey Core - re-encryption of stored catalog credentials
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core entities (PatronAccount, LibraryCard, EncryptionSpec, etc.)
//! - **ports**: Trait definitions for collaborators (ConfigStore, CipherFactory, RecordStore)
//! - **services**: Business logic orchestration (key rotation, status, logging)
//! - **adapters**: Concrete implementations (DuckDB, settings.json, AEAD ciphers)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::cipher::AeadCipherFactory;
use adapters::duckdb::{AccountStore, CardStore, DuckDbRepository};
use adapters::settings::JsonConfigStore;
use config::Config;
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult};
pub use domain::{
    EncryptionSpec, EncryptionStatus, LibraryCard, PatronAccount, RotationOutcome, RotationReport,
};
pub use services::{EntryPoint, LogEvent, LoggingService};

/// Database file name inside the data directory
pub const DATABASE_FILE: &str = "shelfkey.duckdb";

/// Main context for Shelfkey operations
///
/// Holds the configuration snapshot, the record database and the adapters
/// the rotation engine runs against.
pub struct ShelfkeyContext {
    pub config: Config,
    pub data_dir: PathBuf,
    pub repository: Arc<DuckDbRepository>,
    pub config_store: JsonConfigStore,
    pub cipher_factory: AeadCipherFactory,
    pub status_service: StatusService,
}

impl ShelfkeyContext {
    /// Create a new Shelfkey context
    pub fn new(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir)?;

        let db_path = data_dir.join(DATABASE_FILE);
        let repository = Arc::new(
            DuckDbRepository::new(&db_path)
                .with_context(|| format!("Failed to open {}", db_path.display()))?,
        );

        repository.ensure_schema().context("Failed to migrate database")?;

        let config_store = JsonConfigStore::new(data_dir);
        let cipher_factory = AeadCipherFactory::new(config.key_derivation.clone());
        let status_service = StatusService::new(Arc::clone(&repository));

        Ok(Self {
            config,
            data_dir: data_dir.to_path_buf(),
            repository,
            config_store,
            cipher_factory,
            status_service,
        })
    }

    /// Rotation engine bound to this context's configuration and ciphers
    pub fn rotation_service(&self) -> KeyRotationService<'_> {
        KeyRotationService::new(&self.config_store, &self.cipher_factory)
    }

    pub fn account_store(&self) -> AccountStore {
        AccountStore::new(Arc::clone(&self.repository))
    }

    pub fn card_store(&self) -> CardStore {
        CardStore::new(Arc::clone(&self.repository))
    }
}
