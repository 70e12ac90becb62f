//! The per-slot worker loop.
//!
//! A worker repeatedly claims an item, runs the pipeline on it and reports the
//! outcome. It only yields control back to the pool at two checkpoints: before
//! the next pop (pause, graceful close, exhaustion) and right after an item
//! (graceful close). An item is never interrupted.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, error, info, warn};

use crate::config::RunOptions;
use crate::core::state::{Claim, CloseReason, ItemOutcome, PoolCore, WorkerId};
use crate::core::{ExecutionContext, ProcessingPipeline, WorkItem};

/// Drive one worker until the queue runs dry or the worker is marked for
/// graceful close, then release its context and leave the live set.
pub(crate) async fn run_worker<I, C, P>(
    core: Arc<PoolCore<I>>,
    pipeline: Arc<P>,
    id: WorkerId,
    mut ctx: C,
) where
    I: WorkItem,
    C: ExecutionContext,
    P: ProcessingPipeline<I, C>,
{
    let mut paused = core.subscribe_paused();
    debug!("worker started");

    let reason = loop {
        match core.claim_next(id) {
            Claim::Paused => {
                debug!("pool paused, waiting for resume");
                // The sender lives in `core`, so this only returns once resumed.
                let _ = paused.wait_for(|is_paused| !*is_paused).await;
            }
            Claim::Close => break CloseReason::Shrunk,
            Claim::Exhausted => break CloseReason::QueueExhausted,
            Claim::Duplicate(item) => {
                warn!(%item, "item already processed in this run, skipping");
            }
            Claim::Item(item) => {
                let options = core.options();
                let outcome =
                    process_item(pipeline.as_ref(), &item, &mut ctx, &options, core.item_timeout)
                        .await;
                log_outcome(&item, &outcome);
                if core.finish_item(id, item, outcome) {
                    info!("finished current item, closing gracefully");
                    break CloseReason::Shrunk;
                }
            }
        }
    };

    // Shrunk workers always release their slot; the option only covers completion.
    if reason == CloseReason::Shrunk || core.options().close_contexts_on_completion {
        ctx.close().await;
    } else {
        debug!("leaving execution context open for inspection");
    }
    core.retire(id, reason);
}

/// Run the pipeline for one item, converting timeouts and panics into outcomes.
pub(crate) async fn process_item<I, C, P>(
    pipeline: &P,
    item: &I,
    ctx: &mut C,
    options: &RunOptions,
    timeout: Duration,
) -> ItemOutcome
where
    I: WorkItem,
    C: ExecutionContext,
    P: ProcessingPipeline<I, C> + ?Sized,
{
    let run = AssertUnwindSafe(pipeline.process(item, ctx, options)).catch_unwind();
    match tokio::time::timeout(timeout, run).await {
        Ok(Ok(Ok(()))) => ItemOutcome::Succeeded,
        Ok(Ok(Err(e))) => ItemOutcome::Failed(e),
        Ok(Err(panic)) => ItemOutcome::Panicked(panic_message(panic.as_ref())),
        Err(_) => ItemOutcome::TimedOut(timeout),
    }
}

fn log_outcome<I: WorkItem>(item: &I, outcome: &ItemOutcome) {
    match outcome {
        ItemOutcome::Succeeded => info!(%item, "item processed"),
        ItemOutcome::Failed(e) => warn!(%item, error = %e, "item failed, moving on"),
        ItemOutcome::TimedOut(after) => warn!(%item, ?after, "item timed out, moving on"),
        ItemOutcome::Panicked(msg) => error!(%item, panic = %msg, "pipeline panicked, moving on"),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".into())
}
