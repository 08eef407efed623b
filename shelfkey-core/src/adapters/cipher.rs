//! AEAD cipher adapter
//!
//! Supports AES-256-GCM (`aes`) and ChaCha20-Poly1305 (`chacha20`). The
//! 32-byte cipher key is derived from the configured key string with
//! Argon2id. The salt depends only on the algorithm name, so the same
//! algorithm, key and cost parameters always derive the same cipher key.
//!
//! Ciphertext format: `v1$m=<memory>,t=<time>,p=<parallelism>$` followed by
//! base64(nonce || ciphertext || tag). The header records the Argon2 costs
//! the blob was sealed with, and decryption derives its key from the header,
//! so changing `keyDerivation` in settings never strands existing secrets.
//! Blobs without a header are opened with the cipher's own parameters.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use chacha20poly1305::{ChaCha20Poly1305, Nonce as ChaChaNonce};
use rand::Rng;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::domain::result::{Error, Result};
use crate::domain::Argon2Params;
use crate::ports::{Cipher, CipherFactory};

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const SALT_LEN: usize = 16;
const SALT_CONTEXT: &str = "shelfkey catalog secret v1";
const HEADER_VERSION: &str = "v1";

/// Algorithms this adapter can build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AeadAlgorithm {
    Aes256Gcm,
    ChaCha20Poly1305,
}

impl AeadAlgorithm {
    /// Look up an algorithm by its configured name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "aes" | "aes-256-gcm" => Some(Self::Aes256Gcm),
            "chacha20" | "chacha20-poly1305" => Some(Self::ChaCha20Poly1305),
            _ => None,
        }
    }

    /// Canonical configured name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Aes256Gcm => "aes",
            Self::ChaCha20Poly1305 => "chacha20",
        }
    }

    pub fn all() -> &'static [AeadAlgorithm] {
        &[Self::Aes256Gcm, Self::ChaCha20Poly1305]
    }
}

/// Derive a cipher key from a configured key string using Argon2id
fn derive_key(
    algorithm: AeadAlgorithm,
    key: &str,
    params: &Argon2Params,
) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let argon2_params = argon2::Params::new(
        params.memory_cost,
        params.time_cost,
        params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| Error::Config(format!("Invalid key derivation parameters: {:?}", e)))?;

    let argon2 = argon2::Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon2_params,
    );

    let digest = Sha256::digest(format!("{}:{}", SALT_CONTEXT, algorithm.name()).as_bytes());

    let mut derived = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(key.as_bytes(), &digest[..SALT_LEN], &mut *derived)
        .map_err(|e| Error::EncryptionFailed(format!("Failed to derive key: {:?}", e)))?;

    Ok(derived)
}

/// `v1$m=..,t=..,p=..$` prefix for a sealed blob
fn format_header(params: &Argon2Params) -> String {
    format!(
        "{}$m={},t={},p={}$",
        HEADER_VERSION, params.memory_cost, params.time_cost, params.parallelism
    )
}

/// Split a stored blob into its key derivation parameters and base64 payload
///
/// Returns `None` for the parameters when the blob carries no header.
fn parse_blob(blob: &str) -> Result<(Option<Argon2Params>, &str)> {
    let blob = blob.trim();
    let Some(rest) = blob.strip_prefix(HEADER_VERSION).and_then(|r| r.strip_prefix('$')) else {
        return Ok((None, blob));
    };

    let (fields, payload) = rest
        .split_once('$')
        .ok_or_else(|| Error::decryption("ciphertext header is not terminated"))?;

    let (mut memory_cost, mut time_cost, mut parallelism) = (None, None, None);
    for field in fields.split(',') {
        let (name, value) = field
            .split_once('=')
            .ok_or_else(|| Error::decryption("malformed ciphertext header"))?;
        let value: u32 = value
            .parse()
            .map_err(|_| Error::decryption("malformed ciphertext header"))?;
        match name {
            "m" => memory_cost = Some(value),
            "t" => time_cost = Some(value),
            "p" => parallelism = Some(value),
            _ => return Err(Error::decryption("unknown field in ciphertext header")),
        }
    }

    match (memory_cost, time_cost, parallelism) {
        (Some(memory_cost), Some(time_cost), Some(parallelism)) => Ok((
            Some(Argon2Params {
                time_cost,
                memory_cost,
                parallelism,
            }),
            payload,
        )),
        _ => Err(Error::decryption("incomplete ciphertext header")),
    }
}

/// Cipher factory backed by the RustCrypto AEAD implementations
///
/// `params` are the Argon2 costs new ciphertext is sealed with.
#[derive(Debug, Clone, Default)]
pub struct AeadCipherFactory {
    params: Argon2Params,
}

impl AeadCipherFactory {
    pub fn new(params: Argon2Params) -> Self {
        Self { params }
    }
}

impl CipherFactory for AeadCipherFactory {
    fn build(&self, algorithm: &str, key: &str) -> Result<Box<dyn Cipher>> {
        let algorithm = AeadAlgorithm::from_name(algorithm)
            .ok_or_else(|| Error::UnsupportedAlgorithm(algorithm.to_string()))?;
        let derived = derive_key(algorithm, key, &self.params)?;
        Ok(Box::new(AeadCipher {
            algorithm,
            secret: Zeroizing::new(key.to_string()),
            params: self.params.clone(),
            key: derived,
        }))
    }
}

/// A cipher bound to one configured key
///
/// `key` is derived with `params`; blobs sealed under other costs are opened
/// with a key re-derived from `secret`.
pub struct AeadCipher {
    algorithm: AeadAlgorithm,
    secret: Zeroizing<String>,
    params: Argon2Params,
    key: Zeroizing<[u8; KEY_LEN]>,
}

impl AeadCipher {
    fn seal(&self, nonce: &[u8; NONCE_LEN], plaintext: &[u8]) -> Result<Vec<u8>> {
        let sealed = match self.algorithm {
            AeadAlgorithm::Aes256Gcm => Aes256Gcm::new_from_slice(&*self.key)
                .map_err(|e| Error::EncryptionFailed(format!("Failed to create cipher: {}", e)))?
                .encrypt(Nonce::from_slice(nonce), plaintext),
            AeadAlgorithm::ChaCha20Poly1305 => ChaCha20Poly1305::new_from_slice(&*self.key)
                .map_err(|e| Error::EncryptionFailed(format!("Failed to create cipher: {}", e)))?
                .encrypt(ChaChaNonce::from_slice(nonce), plaintext),
        };
        sealed.map_err(|e| {
            Error::EncryptionFailed(format!("{} encryption failed: {}", self.algorithm.name(), e))
        })
    }

    fn open(&self, key: &[u8; KEY_LEN], nonce: &[u8], sealed: &[u8]) -> Result<Vec<u8>> {
        let opened = match self.algorithm {
            AeadAlgorithm::Aes256Gcm => Aes256Gcm::new_from_slice(key)
                .map_err(|e| Error::decryption(format!("Failed to create cipher: {}", e)))?
                .decrypt(Nonce::from_slice(nonce), sealed),
            AeadAlgorithm::ChaCha20Poly1305 => ChaCha20Poly1305::new_from_slice(key)
                .map_err(|e| Error::decryption(format!("Failed to create cipher: {}", e)))?
                .decrypt(ChaChaNonce::from_slice(nonce), sealed),
        };
        opened.map_err(|_| {
            Error::decryption(format!(
                "{} authentication failed (wrong key or algorithm on file)",
                self.algorithm.name()
            ))
        })
    }
}

impl Cipher for AeadCipher {
    fn algorithm(&self) -> &str {
        self.algorithm.name()
    }

    fn encrypt(&self, plaintext: &str) -> Result<String> {
        let nonce: [u8; NONCE_LEN] = rand::thread_rng().gen();
        let sealed = self.seal(&nonce, plaintext.as_bytes())?;

        let mut blob = Vec::with_capacity(NONCE_LEN + sealed.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&sealed);

        Ok(format!(
            "{}{}",
            format_header(&self.params),
            base64::engine::general_purpose::STANDARD.encode(&blob)
        ))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String> {
        let (params, payload) = parse_blob(ciphertext)?;

        let blob = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|_| Error::decryption("ciphertext is not valid base64"))?;

        if blob.len() < NONCE_LEN + TAG_LEN {
            return Err(Error::decryption("ciphertext is too short"));
        }

        let rederived;
        let key: &[u8; KEY_LEN] = match params {
            Some(params) if params != self.params => {
                rederived = derive_key(self.algorithm, &self.secret, &params)
                    .map_err(|e| Error::decryption(e.to_string()))?;
                &*rederived
            }
            _ => &*self.key,
        };

        let (nonce, sealed) = blob.split_at(NONCE_LEN);
        let plaintext = Zeroizing::new(self.open(key, nonce, sealed)?);

        String::from_utf8(plaintext.to_vec())
            .map_err(|_| Error::decryption("decrypted secret is not valid UTF-8"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> AeadCipherFactory {
        AeadCipherFactory::new(Argon2Params {
            time_cost: 1,
            memory_cost: 64,
            parallelism: 1,
        })
    }

    #[test]
    fn test_algorithm_lookup() {
        assert_eq!(AeadAlgorithm::from_name("AES"), Some(AeadAlgorithm::Aes256Gcm));
        assert_eq!(
            AeadAlgorithm::from_name("chacha20-poly1305"),
            Some(AeadAlgorithm::ChaCha20Poly1305)
        );
        assert_eq!(AeadAlgorithm::from_name("rot13-nonexistent"), None);
        assert_eq!(AeadAlgorithm::from_name("none"), None);
    }

    #[test]
    fn test_unsupported_algorithm() {
        let err = factory().build("blowfish", "k0").err().unwrap();
        assert!(matches!(err, Error::UnsupportedAlgorithm(ref name) if name == "blowfish"));
    }

    #[test]
    fn test_decrypts_own_output() {
        for algorithm in AeadAlgorithm::all() {
            let cipher = factory().build(algorithm.name(), "k1").unwrap();
            let blob = cipher.encrypt("secret1").unwrap();
            assert_ne!(blob, "secret1");
            assert_eq!(cipher.decrypt(&blob).unwrap(), "secret1");
        }
    }

    #[test]
    fn test_same_key_rebuilds_same_cipher() {
        let blob = factory().build("aes", "k1").unwrap().encrypt("pw").unwrap();
        let rebuilt = factory().build("aes", "k1").unwrap();
        assert_eq!(rebuilt.decrypt(&blob).unwrap(), "pw");
    }

    #[test]
    fn test_fresh_nonce_per_encryption() {
        let cipher = factory().build("aes", "k1").unwrap();
        assert_ne!(cipher.encrypt("pw").unwrap(), cipher.encrypt("pw").unwrap());
    }

    #[test]
    fn test_wrong_key_fails() {
        let blob = factory().build("aes", "k1").unwrap().encrypt("pw").unwrap();
        let err = factory().build("aes", "k2").unwrap().decrypt(&blob).unwrap_err();
        assert!(matches!(err, Error::Decryption(_)));
    }

    #[test]
    fn test_wrong_algorithm_fails() {
        let blob = factory().build("aes", "k1").unwrap().encrypt("pw").unwrap();
        let err = factory().build("chacha20", "k1").unwrap().decrypt(&blob).unwrap_err();
        assert!(matches!(err, Error::Decryption(_)));
    }

    #[test]
    fn test_ciphertext_records_key_derivation_costs() {
        let blob = factory().build("aes", "k1").unwrap().encrypt("pw").unwrap();
        assert!(blob.starts_with("v1$m=64,t=1,p=1$"));
    }

    #[test]
    fn test_changed_costs_still_open_old_ciphertext() {
        let blob = factory().build("aes", "k1").unwrap().encrypt("pw").unwrap();

        let costlier = AeadCipherFactory::new(Argon2Params {
            time_cost: 2,
            memory_cost: 128,
            parallelism: 1,
        });
        let cipher = costlier.build("aes", "k1").unwrap();
        assert_eq!(cipher.decrypt(&blob).unwrap(), "pw");

        // New ciphertext is sealed under the new costs
        assert!(cipher.encrypt("pw").unwrap().starts_with("v1$m=128,t=2,p=1$"));
    }

    #[test]
    fn test_headerless_ciphertext_uses_cipher_costs() {
        let blob = factory().build("aes", "k1").unwrap().encrypt("pw").unwrap();
        let (_, payload) = blob.rsplit_once('$').unwrap();
        let cipher = factory().build("aes", "k1").unwrap();
        assert_eq!(cipher.decrypt(payload).unwrap(), "pw");
    }

    #[test]
    fn test_malformed_header() {
        let cipher = factory().build("aes", "k1").unwrap();
        for blob in ["v1$m=64,t=1$AAAA", "v1$m=64,t=1,p=x$AAAA", "v1$m=64,t=1,p=1"] {
            assert!(matches!(cipher.decrypt(blob).unwrap_err(), Error::Decryption(_)));
        }
    }

    #[test]
    fn test_malformed_ciphertext() {
        let cipher = factory().build("aes", "k1").unwrap();
        assert!(matches!(cipher.decrypt("not base64!").unwrap_err(), Error::Decryption(_)));
        assert!(matches!(cipher.decrypt("c2hvcnQ=").unwrap_err(), Error::Decryption(_)));
    }
}
