use thiserror::Error;

/// Errors from storage operations.
///
/// None of these variants carry stored content, only keys and reasons.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage quota exceeded: {needed} bytes needed, {available} available")]
    QuotaExceeded { needed: u64, available: u64 },

    #[error("failed to decode '{key}': {reason}")]
    Decode { key: String, reason: String },

    #[error("io error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StorageError {
    /// Whether retrying after freeing space could help.
    pub fn is_quota(&self) -> bool {
        matches!(self, StorageError::QuotaExceeded { .. })
    }
}

/// Errors from decoding a serialized entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("malformed entry: {0}")]
    Malformed(String),

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("entry invariant violated: {0}")]
    Invariant(String),
}

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(String),

    #[error("failed to parse config: {0}")]
    Parse(String),
}

/// Errors from recovery state transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecoveryError {
    #[error("no recovery candidate for '{0}'")]
    UnknownCandidate(String),

    #[error("candidate '{id}' already {state}")]
    AlreadyResolved { id: String, state: String },
}
