//! Self-describing stored value.
//!
//! ```json
//! {"v":1,"gz":false,"enc":true,"at":1760000000000,"exp":1760604800000,"sum":"9f2c...","data":"base64..."}
//! ```
//!
//! `gz` and `enc` record the transforms applied to the payload (gzip first,
//! then AES-256-GCM). `data` holds the text as-is when neither applies and
//! base64 of the transformed bytes otherwise. `sum` is the first 16 hex
//! digits of the SHA-256 of `data`. Readers trust the envelope, never the
//! caller's options, so a value written with compression reads back through
//! an adapter configured without it.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use draftsafe_types::config::COMPRESS_THRESHOLD_BYTES;

use crate::compression::{gunzip, gzip};
use crate::crypto::{CipherError, EntryCipher};

pub const ENVELOPE_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("not an envelope: {0}")]
    Malformed(String),

    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(u32),

    #[error("checksum mismatch")]
    Checksum,

    #[error("value is encrypted but no key is configured")]
    MissingKey,

    #[error("payload is not valid base64")]
    Base64,

    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error("decompression failed: {0}")]
    Decompress(String),

    #[error("compression failed: {0}")]
    Compress(String),

    #[error("payload is not valid UTF-8")]
    Utf8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub v: u32,
    pub gz: bool,
    pub enc: bool,
    /// Write time, epoch millis.
    pub at: i64,
    /// Expiry, epoch millis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    pub sum: String,
    pub data: String,
}

fn checksum(data: &str) -> String {
    let digest = Sha256::digest(data.as_bytes());
    format!("{digest:x}")[..16].to_string()
}

impl Envelope {
    /// Wrap `value`, compressing when asked and the value is large enough,
    /// and encrypting when a cipher is given.
    pub fn seal(
        value: &str,
        compress: bool,
        cipher: Option<&EntryCipher>,
        at: i64,
        exp: Option<i64>,
    ) -> Result<Self, EnvelopeError> {
        let gz = compress && value.len() > COMPRESS_THRESHOLD_BYTES;
        let enc = cipher.is_some();

        let data = if !gz && !enc {
            value.to_string()
        } else {
            let mut bytes = value.as_bytes().to_vec();
            if gz {
                bytes = gzip(&bytes).map_err(|e| EnvelopeError::Compress(e.to_string()))?;
            }
            if let Some(cipher) = cipher {
                bytes = cipher.encrypt(&bytes)?;
            }
            STANDARD.encode(bytes)
        };

        Ok(Self {
            v: ENVELOPE_VERSION,
            gz,
            enc,
            at,
            exp,
            sum: checksum(&data),
            data,
        })
    }

    /// Parse the envelope without touching the payload.
    pub fn parse(raw: &str) -> Result<Self, EnvelopeError> {
        let envelope: Self =
            serde_json::from_str(raw).map_err(|e| EnvelopeError::Malformed(e.to_string()))?;
        if envelope.v != ENVELOPE_VERSION {
            return Err(EnvelopeError::UnsupportedVersion(envelope.v));
        }
        Ok(envelope)
    }

    pub fn is_expired_at(&self, now_millis: i64) -> bool {
        self.exp.is_some_and(|exp| now_millis > exp)
    }

    /// Reverse the transforms the envelope declares.
    pub fn open(&self, cipher: Option<&EntryCipher>) -> Result<String, EnvelopeError> {
        if checksum(&self.data) != self.sum {
            return Err(EnvelopeError::Checksum);
        }
        if !self.gz && !self.enc {
            return Ok(self.data.clone());
        }

        let mut bytes = STANDARD
            .decode(&self.data)
            .map_err(|_| EnvelopeError::Base64)?;
        if self.enc {
            let cipher = cipher.ok_or(EnvelopeError::MissingKey)?;
            bytes = cipher.decrypt(&bytes)?;
        }
        if self.gz {
            bytes = gunzip(&bytes).map_err(|e| EnvelopeError::Decompress(e.to_string()))?;
        }
        String::from_utf8(bytes).map_err(|_| EnvelopeError::Utf8)
    }

    pub fn to_json(&self) -> Result<String, EnvelopeError> {
        serde_json::to_string(self).map_err(|e| EnvelopeError::Malformed(e.to_string()))
    }
}
