//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the RecordStore port (accounts and cards)
//! - settings.json for the ConfigStore port
//! - RustCrypto AEAD ciphers for the CipherFactory port
//! - In-memory stores for tests and dry runs

pub mod cipher;
pub mod duckdb;
pub mod memory;
pub mod settings;
