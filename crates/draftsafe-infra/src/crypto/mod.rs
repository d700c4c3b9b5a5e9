//! Encryption of stored entries.

pub mod cipher;
pub mod key_source;

pub use cipher::{CipherError, EntryCipher};
pub use key_source::KeySource;
