//! Pool controller: owns the target concurrency and reconciles the live
//! worker set toward it.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::{PoolConfig, RunOptions};
use crate::core::state::{PoolCore, PoolEvent, PoolPhase, PoolStats, PoolStatus, WorkerSnapshot};
use crate::core::worker::run_worker;
use crate::core::{
    ContextFactory, ExecutionContext, ItemSource, PoolError, ProcessingPipeline, Spawn, WorkItem,
    WorkerId,
};
use crate::runtime::TokioSpawner;

/// What one reconciliation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciled {
    /// Workers added to the live set.
    pub spawned: usize,
    /// Workers newly marked for graceful close.
    pub marked_for_close: usize,
    /// Spawn attempts whose execution context could not be created.
    pub spawn_failures: usize,
}

/// Drives a pool of workers over a shared queue.
///
/// `start`, `set_target` and `enqueue` are serialized through an async control
/// lock, so reconciliation passes never interleave. Pause and resume only
/// flip the shared flag and can be called at any time.
pub struct PoolController<I, F, P, S = TokioSpawner>
where
    I: WorkItem,
    F: ContextFactory,
{
    core: Arc<PoolCore<I>>,
    source: Arc<dyn ItemSource<I>>,
    factory: Arc<F>,
    pipeline: Arc<P>,
    spawner: S,
    control: tokio::sync::Mutex<()>,
    config: PoolConfig,
}

impl<I, F, P, S> PoolController<I, F, P, S>
where
    I: WorkItem,
    F: ContextFactory,
    P: ProcessingPipeline<I, F::Context>,
    S: Spawn + Clone + Send + Sync + 'static,
{
    /// Create a controller from its collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] if `config` fails validation.
    pub fn new(
        config: PoolConfig,
        source: Arc<dyn ItemSource<I>>,
        factory: F,
        pipeline: P,
        spawner: S,
    ) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;
        let core = PoolCore::new(config.item_timeout(), config.event_capacity, config.options);
        Ok(Self {
            core: Arc::new(core),
            source,
            factory: Arc::new(factory),
            pipeline: Arc::new(pipeline),
            spawner,
            control: tokio::sync::Mutex::new(()),
            config,
        })
    }

    /// Start a run: fetch the initial items, then spawn `target` workers.
    ///
    /// Starting while a run is in progress only adjusts the target; `options`
    /// are ignored until the next run.
    ///
    /// # Errors
    ///
    /// Returns the item source failure, or [`PoolError::NoItems`] when the
    /// source had nothing to schedule. The pool is back to not running and no
    /// worker was spawned.
    pub async fn start(&self, target: usize, options: RunOptions) -> Result<Reconciled, PoolError> {
        let _guard = self.control.lock().await;
        self.start_locked(target, options).await
    }

    /// Start with the configured default concurrency and options.
    ///
    /// # Errors
    ///
    /// See [`PoolController::start`].
    pub async fn start_default(&self) -> Result<Reconciled, PoolError> {
        self.start(self.config.target_workers, self.config.options)
            .await
    }

    /// Set the desired concurrency.
    ///
    /// When no run is in progress this starts one with the last used options.
    /// Otherwise workers are spawned (each with a fresh execution context) or
    /// the newest active workers are marked to close after their current item.
    ///
    /// # Errors
    ///
    /// Only fails when it has to start the pool and the start fails.
    pub async fn set_target(&self, target: usize) -> Result<Reconciled, PoolError> {
        let _guard = self.control.lock().await;
        if !self.phase().is_running() {
            let options = self.core.options();
            return self.start_locked(target, options).await;
        }
        info!(target_workers = target, "target concurrency changed");
        self.core.set_target(target);
        Ok(self.reconcile_locked().await)
    }

    /// Append items to the queue. A running pool refills toward its target.
    pub async fn enqueue(&self, items: impl IntoIterator<Item = I>) -> Reconciled {
        let _guard = self.control.lock().await;
        self.core.queue.extend(items);
        self.reconcile_locked().await
    }

    /// Hold every worker before its next pop. Items in flight complete.
    pub fn pause(&self) {
        info!("pausing pool");
        self.core.set_paused(true);
    }

    /// Release paused workers, optionally after `delay`.
    pub async fn resume(&self, delay: Option<Duration>) {
        if let Some(delay) = delay.filter(|d| !d.is_zero()) {
            debug!(?delay, "delaying resume");
            tokio::time::sleep(delay).await;
        }
        info!("resuming pool");
        self.core.set_paused(false);
    }

    /// Current `(is_running, is_paused)` pair.
    pub fn status(&self) -> PoolStatus {
        self.core.state.lock().status()
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> PoolPhase {
        self.core.state.lock().phase
    }

    /// Utilization counters.
    pub fn stats(&self) -> PoolStats {
        self.core.stats()
    }

    /// Snapshot of the live workers, ordered by id.
    pub fn workers(&self) -> Vec<WorkerSnapshot<I>> {
        self.core.snapshot_workers()
    }

    /// Subscribe to pool events.
    pub fn subscribe(&self) -> broadcast::Receiver<PoolEvent<I>> {
        self.core.subscribe_events()
    }

    /// Watch the status pair.
    pub fn watch_status(&self) -> watch::Receiver<PoolStatus> {
        self.core.subscribe_status()
    }

    /// Wait until no run is in progress. Returns immediately when idle.
    pub async fn wait_until_drained(&self) {
        let mut status = self.core.subscribe_status();
        // The sender is owned by `self.core`, which outlives this borrow.
        let _ = status.wait_for(|s| !s.is_running).await;
    }

    /// Options of the current (or last) run.
    pub fn options(&self) -> RunOptions {
        self.core.options()
    }

    /// Configuration this controller was built with.
    pub const fn config(&self) -> &PoolConfig {
        &self.config
    }

    async fn start_locked(
        &self,
        target: usize,
        options: RunOptions,
    ) -> Result<Reconciled, PoolError> {
        if !self.core.begin_start(target, options) {
            let current = self.core.options();
            if options == current {
                warn!(target_workers = target, "pool already running, adjusting target only");
            } else {
                warn!(
                    target_workers = target,
                    ignored = ?options,
                    ?current,
                    "pool already running, adjusting target only and keeping current options"
                );
            }
            self.core.set_target(target);
            return Ok(self.reconcile_locked().await);
        }

        let fetched = match self.source.fetch_items().await {
            Ok(items) if items.is_empty() => Err(PoolError::NoItems),
            other => other,
        };
        let items = match fetched {
            Ok(items) => items,
            Err(e) => {
                error!(error = %e, "pool start aborted");
                self.core.abort_start();
                return Err(e);
            }
        };

        info!(items = items.len(), "initial items loaded");
        self.core.enter_running(items);
        Ok(self.reconcile_locked().await)
    }

    async fn reconcile_locked(&self) -> Reconciled {
        let plan = self.core.plan_reconcile();
        let mut report = Reconciled {
            marked_for_close: plan.close.len(),
            ..Reconciled::default()
        };
        if plan.spawn.is_empty() {
            if report.marked_for_close > 0 {
                info!(marked_for_close = report.marked_for_close, "shrinking worker set");
            }
            return report;
        }

        let contexts = join_all(plan.spawn.iter().map(|id| self.factory.create(*id))).await;
        for (id, created) in plan.spawn.into_iter().zip(contexts) {
            match created {
                Ok(mut ctx) => {
                    if self.core.register(id) {
                        self.spawn_worker(id, ctx);
                        report.spawned += 1;
                    } else {
                        ctx.close().await;
                    }
                }
                Err(e) => {
                    warn!(worker_id = %id, error = %e, "worker spawn failed, pool under-provisioned");
                    self.core.record_spawn_failure();
                    report.spawn_failures += 1;
                }
            }
        }
        info!(
            spawned = report.spawned,
            failed = report.spawn_failures,
            marked_for_close = report.marked_for_close,
            "reconciled worker set"
        );
        report
    }

    fn spawn_worker(&self, id: WorkerId, ctx: F::Context) {
        let core = Arc::clone(&self.core);
        let pipeline = Arc::clone(&self.pipeline);
        self.spawner.spawn(
            run_worker(core, pipeline, id, ctx).instrument(info_span!("worker", worker_id = %id)),
        );
    }
}
