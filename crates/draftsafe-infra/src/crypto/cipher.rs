//! AES-256-GCM encryption for entries at rest.
//!
//! Output format: `nonce (12 bytes) || ciphertext`. A fresh random nonce is
//! drawn for every call, so equal plaintexts never produce equal output.
//!
//! Error values never contain plaintext or key material.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const NONCE_SIZE: usize = 12;

const KEYCHAIN_SERVICE: &str = "draftsafe";
const KEYCHAIN_USER: &str = "entry-key";

/// Fixed salt: the passphrase carries the entropy and the derived key is
/// never stored, only used.
const PASSPHRASE_SALT: &[u8] = b"draftsafe-entry-key-v1";

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("encryption failed")]
    EncryptionFailed,

    #[error("decryption failed")]
    DecryptionFailed,

    #[error("invalid ciphertext: too short")]
    CiphertextTooShort,

    #[error("key derivation failed")]
    KeyDerivationFailed,

    #[error("keychain unavailable: {0}")]
    KeychainUnavailable(String),

    #[error("keychain error: {0}")]
    KeychainError(String),
}

/// Symmetric cipher applied to entry payloads.
pub struct EntryCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for EntryCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EntryCipher(..)")
    }
}

impl EntryCipher {
    pub fn new(key: &[u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(key.into()),
        }
    }

    /// Derive the key from a passphrase with Argon2id
    /// (19 MiB memory, 2 iterations, 1 lane).
    pub fn from_passphrase(passphrase: &SecretString) -> Result<Self, CipherError> {
        use argon2::{Algorithm, Argon2, Params, Version};

        let params =
            Params::new(19456, 2, 1, Some(32)).map_err(|_| CipherError::KeyDerivationFailed)?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut key = [0u8; 32];
        argon2
            .hash_password_into(
                passphrase.expose_secret().as_bytes(),
                PASSPHRASE_SALT,
                &mut key,
            )
            .map_err(|_| CipherError::KeyDerivationFailed)?;
        Ok(Self::new(&key))
    }

    /// Load the key from the OS keychain, generating and storing one on
    /// first use. The key is kept base64-encoded.
    pub fn from_keychain() -> Result<Self, CipherError> {
        let entry = keyring::Entry::new(KEYCHAIN_SERVICE, KEYCHAIN_USER)
            .map_err(|e| CipherError::KeychainUnavailable(e.to_string()))?;

        match entry.get_password() {
            Ok(encoded) => {
                let bytes = STANDARD
                    .decode(encoded.trim())
                    .map_err(|_| CipherError::KeychainError("corrupted key in keychain".into()))?;
                let key: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| CipherError::KeychainError("invalid key length in keychain".into()))?;
                Ok(Self::new(&key))
            }
            Err(keyring::Error::NoEntry) => {
                let key = random_key();
                entry
                    .set_password(&STANDARD.encode(key))
                    .map_err(|e| CipherError::KeychainError(e.to_string()))?;
                tracing::info!("generated new entry key in OS keychain");
                Ok(Self::new(&key))
            }
            Err(e) => Err(CipherError::KeychainUnavailable(e.to_string())),
        }
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| CipherError::EncryptionFailed)?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, CipherError> {
        if data.len() < NONCE_SIZE {
            return Err(CipherError::CiphertextTooShort);
        }
        let (nonce, ciphertext) = data.split_at(NONCE_SIZE);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CipherError::DecryptionFailed)
    }
}

fn random_key() -> [u8; 32] {
    use aes_gcm::aead::rand_core::RngCore;
    let mut key = [0u8; 32];
    OsRng.fill_bytes(&mut key);
    key
}
