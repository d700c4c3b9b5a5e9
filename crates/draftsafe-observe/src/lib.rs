//! Observability setup for draftsafe binaries.

pub mod tracing_setup;
