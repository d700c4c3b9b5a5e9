//! Shared domain types for draftsafe.
//!
//! This crate contains the types used across the auto-save workspace:
//! entries, configuration, recovery candidates, the export blob, and the
//! error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod config;
pub mod entry;
pub mod error;
pub mod recovery;
pub mod storage;
