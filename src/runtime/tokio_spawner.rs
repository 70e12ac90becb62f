//! Tokio runtime spawner implementation.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::runtime::{Handle, Runtime};

use crate::core::{PoolError, Spawn};

/// Tokio-based spawner that runs worker loops as detached tasks.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: Handle,
    // Keeps a runtime built by `with_worker_threads` alive.
    runtime: Option<Arc<Runtime>>,
}

impl fmt::Debug for TokioSpawner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioSpawner")
            .field("owns_runtime", &self.runtime.is_some())
            .finish()
    }
}

impl TokioSpawner {
    /// Create a spawner from a tokio runtime handle.
    #[must_use]
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            runtime: None,
        }
    }

    /// Spawner for the runtime the caller is running on.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::MissingComponent`] outside a tokio runtime.
    pub fn current() -> Result<Self, PoolError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|_| PoolError::MissingComponent("tokio runtime"))
    }

    /// Create a spawner owning a new multi-threaded runtime.
    ///
    /// The runtime lives as long as the last clone of the spawner and must be
    /// dropped outside of async context.
    pub fn with_worker_threads(worker_threads: usize) -> Result<Self, std::io::Error> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads)
            .thread_name("scrape-pool-worker")
            .enable_all()
            .build()?;
        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Some(Arc::new(runtime)),
        })
    }

    /// Handle of the runtime tasks are spawned on.
    #[must_use]
    pub const fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl Spawn for TokioSpawner {
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        drop(self.handle.spawn(fut));
    }
}
