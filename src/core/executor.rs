//! Work item abstraction and the collaborator traits the scheduler drives.

use std::fmt::{Debug, Display};
use std::future::Future;
use std::hash::Hash;

use async_trait::async_trait;

use super::pipeline::PipelineError;
use super::state::WorkerId;
use super::PoolError;
use crate::config::RunOptions;

/// Marker trait for schedulable work items.
///
/// Items are opaque identifiers (ticker symbols in the scrape deployment).
/// They must be hashable so the pool can detect an item that was re-queued by
/// mistake, and displayable so they can be logged and templated into URLs.
pub trait WorkItem: Clone + Eq + Hash + Debug + Display + Send + Sync + 'static {}

/// Blanket implementation: any type meeting the requirements is a `WorkItem`.
impl<T> WorkItem for T where T: Clone + Eq + Hash + Debug + Display + Send + Sync + 'static {}

/// Pull interface returning the initial ordered list of work items.
///
/// A failure here aborts pool startup.
#[async_trait]
pub trait ItemSource<I: WorkItem>: Send + Sync + 'static {
    /// Fetch the items to schedule, in dequeue order.
    async fn fetch_items(&self) -> Result<Vec<I>, PoolError>;
}

/// An isolated execution context bound to one worker slot (a browser tab in
/// the scrape deployment).
#[async_trait]
pub trait ExecutionContext: Send + 'static {
    /// Release the resources held by this context.
    async fn close(&mut self);
}

/// Creates a fresh [`ExecutionContext`] for every spawned worker.
#[async_trait]
pub trait ContextFactory: Send + Sync + 'static {
    /// Context type produced by this factory.
    type Context: ExecutionContext;

    /// Create a context for `worker`.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::ContextCreation`] when the host refuses to hand out
    /// another context (resource exhaustion, browser gone, ...).
    async fn create(&self, worker: WorkerId) -> Result<Self::Context, PoolError>;
}

/// Processes one work item inside a worker's execution context.
///
/// Implementations perform readiness detection, extraction and persistence,
/// and never manage concurrency themselves. Every failure path must be
/// converted into a [`PipelineError`] so the worker loop can move on.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use prometheus_scrape_pool::core::{ProcessingPipeline, PipelineError};
///
/// struct Echo;
///
/// #[async_trait]
/// impl ProcessingPipeline<String, MyContext> for Echo {
///     async fn process(
///         &self,
///         item: &String,
///         _ctx: &mut MyContext,
///         _options: &RunOptions,
///     ) -> Result<(), PipelineError> {
///         tracing::info!(%item, "processed");
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait ProcessingPipeline<I, C>: Send + Sync + 'static
where
    I: WorkItem,
    C: ExecutionContext,
{
    /// Run the full fetch → readiness → extract → persist sequence for `item`
    /// under the options of the current run.
    async fn process(&self, item: &I, ctx: &mut C, options: &RunOptions)
        -> Result<(), PipelineError>;
}

/// Abstraction for spawning worker loops on a runtime.
pub trait Spawn {
    /// Spawn a detached future.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}
