//! Tracking for a session's background operations.
//!
//! Uploads, deletes, and scheduled flushes are spawned into an [`InFlight`]
//! set owned by whoever started them. Dropping the set aborts what is still
//! running.
//!
//! Abort is best-effort. A task is cancelled at its next `.await`; a request
//! whose bytes already reached the socket may still be processed by the
//! server. Callers must treat every tracked operation as "may or may not have
//! happened" after teardown.

use std::future::Future;

use tokio::runtime::Handle;
use tokio::task::JoinSet;

#[derive(Debug)]
pub struct InFlight {
    tasks: JoinSet<()>,
    runtime: Handle,
}

impl InFlight {
    /// Track tasks on `runtime`.
    pub fn new(runtime: Handle) -> Self {
        Self {
            tasks: JoinSet::new(),
            runtime,
        }
    }

    pub fn spawn<F>(&mut self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.reap();
        self.tasks.spawn_on(fut, &self.runtime);
    }

    /// Forget tasks that have already finished.
    pub fn reap(&mut self) {
        while let Some(res) = self.tasks.try_join_next() {
            if let Err(e) = res
                && e.is_panic()
            {
                tracing::warn!(error = %e, "background task panicked");
            }
        }
    }

    /// Number of tracked tasks, finished ones included until reaped.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for every tracked task to finish.
    pub async fn drain(&mut self) {
        while self.tasks.join_next().await.is_some() {}
    }

    pub fn abort_all(&mut self) {
        if !self.tasks.is_empty() {
            tracing::debug!(count = self.tasks.len(), "aborting in-flight operations");
        }
        self.tasks.abort_all();
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.abort_all();
    }
}
