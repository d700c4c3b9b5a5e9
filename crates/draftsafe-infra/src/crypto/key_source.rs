//! Where the entry encryption key comes from.

use secrecy::{ExposeSecret, SecretBox, SecretString};

use super::cipher::{CipherError, EntryCipher};

/// Externally supplied key material.
pub enum KeySource {
    /// A raw 256-bit key.
    Raw(SecretBox<[u8; 32]>),
    /// A passphrase run through Argon2id.
    Passphrase(SecretString),
    /// A key generated on first use and kept in the OS keychain.
    Keychain,
}

impl std::fmt::Debug for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySource::Raw(_) => f.write_str("KeySource::Raw(..)"),
            KeySource::Passphrase(_) => f.write_str("KeySource::Passphrase(..)"),
            KeySource::Keychain => f.write_str("KeySource::Keychain"),
        }
    }
}

impl KeySource {
    pub fn raw(key: [u8; 32]) -> Self {
        KeySource::Raw(SecretBox::new(Box::new(key)))
    }

    pub fn passphrase(passphrase: impl Into<String>) -> Self {
        KeySource::Passphrase(SecretString::from(passphrase.into()))
    }

    /// Build the cipher. Keychain access happens here, not at construction.
    pub fn into_cipher(self) -> Result<EntryCipher, CipherError> {
        match self {
            KeySource::Raw(key) => Ok(EntryCipher::new(key.expose_secret())),
            KeySource::Passphrase(passphrase) => EntryCipher::from_passphrase(&passphrase),
            KeySource::Keychain => EntryCipher::from_keychain(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_never_shows_material() {
        let shown = format!("{:?}", KeySource::passphrase("hunter2"));
        assert!(!shown.contains("hunter2"));
        assert_eq!(format!("{:?}", KeySource::raw([9; 32])), "KeySource::Raw(..)");
    }

    #[test]
    fn raw_and_passphrase_build_ciphers() {
        let raw = KeySource::raw([3; 32]).into_cipher().unwrap();
        let again = KeySource::raw([3; 32]).into_cipher().unwrap();
        let sealed = raw.encrypt(b"x").unwrap();
        assert_eq!(again.decrypt(&sealed).unwrap(), b"x");

        assert!(KeySource::passphrase("pw").into_cipher().is_ok());
    }
}
