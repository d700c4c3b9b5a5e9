//! Process-wide manager instance.
//!
//! Hosts that want a single shared manager construct one explicitly at
//! startup, `install` it, and `teardown` it on exit. Nothing is created
//! lazily.

use std::sync::{Mutex, MutexGuard};

use draftsafe_types::storage::TeardownPolicy;

use crate::stack::DefaultManager;

static INSTANCE: Mutex<Option<DefaultManager>> = Mutex::new(None);

#[derive(Debug, thiserror::Error)]
pub enum GlobalError {
    #[error("an auto-save manager is already installed")]
    AlreadyInstalled,
}

fn slot() -> MutexGuard<'static, Option<DefaultManager>> {
    INSTANCE.lock().unwrap_or_else(|e| e.into_inner())
}

/// Register `manager` as the process-wide instance.
pub fn install(manager: DefaultManager) -> Result<(), GlobalError> {
    let mut slot = slot();
    if slot.is_some() {
        return Err(GlobalError::AlreadyInstalled);
    }
    *slot = Some(manager);
    tracing::debug!("process-wide auto-save manager installed");
    Ok(())
}

/// A handle to the installed manager, if any.
pub fn instance() -> Option<DefaultManager> {
    slot().clone()
}

/// Unregister the instance and shut it down under `policy`.
///
/// Returns the number of ids flushed or discarded, or `None` when nothing
/// was installed.
pub async fn teardown(policy: TeardownPolicy) -> Option<usize> {
    let manager = slot().take()?;
    Some(manager.shutdown(policy).await)
}
