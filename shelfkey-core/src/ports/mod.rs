//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The rotation
//! engine depends only on these traits, not on concrete implementations.

mod cipher;
mod config_store;
mod progress;
mod record_store;

pub use cipher::{Cipher, CipherFactory};
pub use config_store::{
    ConfigStore, AUTHENTICATION_SECTION, ENCRYPTION_ALGORITHM_KEY, ENCRYPTION_KEY_KEY,
    ENCRYPT_SECRETS_KEY,
};
pub use progress::{NoProgress, RotationProgress};
pub use record_store::RecordStore;
