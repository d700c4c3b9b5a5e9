//! Auto-save business logic and port definitions for draftsafe.
//!
//! This crate defines the storage port that the infrastructure layer
//! implements, plus everything built on top of it: the entry codec, the
//! deferred scheduler, the auto-save manager, the recovery coordinator, and
//! the element binding layer. It depends only on `draftsafe-types` -- never
//! on `draftsafe-infra` or any storage crate.

pub mod binding;
pub mod clock;
pub mod codec;
pub mod manager;
pub mod recovery;
pub mod scheduler;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;
