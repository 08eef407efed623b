//! Cipher ports - symmetric encryption of stored secrets

use crate::domain::result::Result;

/// A symmetric cipher bound to one algorithm and key
///
/// Ciphertexts are printable strings so they can be stored in text columns.
pub trait Cipher: Send + Sync {
    /// Canonical algorithm name this cipher was built for
    fn algorithm(&self) -> &str;

    fn encrypt(&self, plaintext: &str) -> Result<String>;

    /// Fails with `Error::Decryption` when the ciphertext was not produced
    /// under this algorithm and key
    fn decrypt(&self, ciphertext: &str) -> Result<String>;
}

/// Builds ciphers from an (algorithm, key) pair
pub trait CipherFactory {
    /// Fails with `Error::UnsupportedAlgorithm` for unknown algorithm names
    fn build(&self, algorithm: &str, key: &str) -> Result<Box<dyn Cipher>>;
}
