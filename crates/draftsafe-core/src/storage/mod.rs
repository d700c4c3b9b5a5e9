//! Storage port definitions.
//!
//! The concrete adapter (areas, compression, encryption, TTL) lives in
//! `draftsafe-infra`.

pub mod store;

pub use store::AutoSaveStorage;
