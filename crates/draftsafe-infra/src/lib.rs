//! Infrastructure layer for draftsafe.
//!
//! Contains implementations of the ports defined in `draftsafe-core`:
//! raw storage areas (in-memory session area, file-backed persistent area),
//! the `StorageAdapter` envelope codec with compression and AES-256-GCM
//! encryption, configuration loading, and the process-wide manager instance.

pub mod compression;
pub mod config;
pub mod crypto;
pub mod global;
pub mod stack;
pub mod storage;
