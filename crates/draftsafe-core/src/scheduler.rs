//! Cancellable deferred tasks keyed by id.
//!
//! `DeferredScheduler::schedule(id, delay, task)` runs `task` after `delay`
//! unless it is cancelled first. Scheduling again for the same id cancels the
//! previous task, which is how per-id debouncing is expressed.
//!
//! Cancellation only covers the waiting period. Once the delay has elapsed
//! the task runs to completion; callers that need to discard a task that
//! already started must check their own state (the manager does this with
//! write generations).

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

/// Handle to one scheduled task.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Debug)]
struct Scheduled {
    ticket: u64,
    token: CancellationToken,
}

/// Per-id deferred task runner on the tokio runtime.
///
/// Cloning shares the same task table.
#[derive(Debug, Clone, Default)]
pub struct DeferredScheduler {
    tasks: Arc<DashMap<String, Scheduled>>,
    tickets: Arc<AtomicU64>,
}

impl DeferredScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` after `delay`, replacing any task still waiting for `id`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, id: &str, delay: Duration, task: F) -> CancelHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let ticket = self.tickets.fetch_add(1, Ordering::Relaxed);

        let previous = self.tasks.insert(
            id.to_string(),
            Scheduled {
                ticket,
                token: token.clone(),
            },
        );
        if let Some(prev) = previous {
            prev.token.cancel();
        }

        let tasks = Arc::clone(&self.tasks);
        let waiter = token.clone();
        let id = id.to_string();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = waiter.cancelled() => {
                    tracing::trace!(id = %id, "deferred task cancelled");
                    return;
                }
                () = tokio::time::sleep(delay) => {}
            }
            tasks.remove_if(&id, |_, scheduled| scheduled.ticket == ticket);
            task.await;
        });

        CancelHandle { token }
    }

    /// Cancel the task waiting for `id`. Returns whether one was waiting.
    pub fn cancel(&self, id: &str) -> bool {
        match self.tasks.remove(id) {
            Some((_, scheduled)) => {
                scheduled.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every waiting task.
    pub fn cancel_all(&self) -> usize {
        let ids: Vec<String> = self.tasks.iter().map(|r| r.key().clone()).collect();
        ids.iter().filter(|id| self.cancel(id)).count()
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    pub fn pending_count(&self) -> usize {
        self.tasks.len()
    }
}
