//! Shared pool state, worker lifecycle and status signalling.
//!
//! All scheduling decisions that touch more than one worker are made while
//! holding the single `PoolState` mutex. The queue has its own lock, always
//! acquired *after* the state lock, so the pause flag, the duplicate guard and
//! the pop form one atomic step.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::RunOptions;
use crate::core::pipeline::PipelineError;
use crate::core::queue::WorkQueue;
use crate::core::WorkItem;
use crate::util::now_ms;

/// Unique identifier of a worker within a pool. Ids grow monotonically, so
/// ordering by id is ordering by spawn time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorkerId(pub u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// Lifecycle of a single worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Counted toward the target; pops items.
    Active,
    /// Will terminate after its current item.
    PendingClose,
    /// Left its loop; releasing its execution context.
    Closing,
    /// Gone from the live set.
    Closed,
}

/// Lifecycle of the pool as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolPhase {
    /// Never started, or the last start attempt failed.
    NotStarted,
    /// Fetching the initial item set.
    Starting,
    /// Workers are (or may be) draining the queue.
    Running,
    /// The queue ran dry and every worker exited.
    Drained,
}

impl PoolPhase {
    /// Whether this phase reports `is_running`.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }
}

/// Externally visible status: the pair rendered by control surfaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStatus {
    /// A run is in progress.
    pub is_running: bool,
    /// Workers are held before their next pop.
    pub is_paused: bool,
}

/// Why a worker left its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// No item was left to pop.
    QueueExhausted,
    /// The pool shrank and this worker was selected.
    Shrunk,
}

/// Result of one pipeline invocation as seen by the worker loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// The pipeline reported success.
    Succeeded,
    /// The pipeline reported a failure.
    Failed(PipelineError),
    /// The invocation exceeded the per-item timeout.
    TimedOut(Duration),
    /// The pipeline panicked; the message is kept for logging.
    Panicked(String),
}

impl ItemOutcome {
    /// Whether the item was processed successfully.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Events broadcast to pool listeners.
#[derive(Debug, Clone)]
pub enum PoolEvent<I> {
    /// `is_running` or `is_paused` changed.
    StatusChanged(PoolStatus),
    /// A worker joined the live set.
    WorkerSpawned(WorkerId),
    /// A worker was selected for graceful close.
    WorkerMarkedForClose(WorkerId),
    /// A worker popped an item.
    ItemStarted {
        /// Worker that owns the item.
        worker: WorkerId,
        /// The item.
        item: I,
    },
    /// A worker popped an item that was already processed in this run.
    DuplicateSkipped {
        /// Worker that popped the duplicate.
        worker: WorkerId,
        /// The item.
        item: I,
    },
    /// A worker finished an item.
    ItemFinished {
        /// Worker that owned the item.
        worker: WorkerId,
        /// The item.
        item: I,
        /// What the pipeline reported.
        outcome: ItemOutcome,
    },
    /// A worker left the live set.
    WorkerClosed {
        /// The worker.
        worker: WorkerId,
        /// Why it exited.
        reason: CloseReason,
    },
}

/// Point-in-time view of one live worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSnapshot<I> {
    /// Worker id.
    pub id: WorkerId,
    /// Lifecycle state.
    pub state: WorkerState,
    /// Item being processed, if any.
    pub current_item: Option<I>,
}

/// Statistics about pool utilization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Requested concurrency.
    pub target: usize,
    /// Live workers counted toward the target.
    pub active_workers: usize,
    /// Live workers waiting to close after their current item.
    pub pending_close: usize,
    /// Workers currently holding an item.
    pub in_flight: usize,
    /// Items still queued.
    pub queued_items: usize,
    /// Items the pipeline reported as successful.
    pub succeeded_items: u64,
    /// Items that failed, timed out or panicked.
    pub failed_items: u64,
    /// Popped items dropped by the duplicate guard.
    pub duplicates_skipped: u64,
    /// Workers spawned since construction.
    pub workers_spawned: u64,
    /// Spawn attempts that failed to obtain an execution context.
    pub spawn_failures: u64,
    /// Identifier of the current (or last) run.
    pub run_id: Option<Uuid>,
    /// When the current (or last) run started, in ms since the Unix epoch.
    pub run_started_at_ms: Option<u64>,
}

/// Lock-free counters feeding [`PoolStats`].
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub succeeded_items: AtomicU64,
    pub failed_items: AtomicU64,
    pub duplicates_skipped: AtomicU64,
    pub workers_spawned: AtomicU64,
    pub spawn_failures: AtomicU64,
}

#[derive(Debug)]
pub(crate) struct WorkerHandle<I> {
    pub state: WorkerState,
    pub current_item: Option<I>,
}

/// The mutable scheduler state. Only ever touched under `PoolCore::state`.
#[derive(Debug)]
pub(crate) struct PoolState<I> {
    pub phase: PoolPhase,
    pub paused: bool,
    pub target: usize,
    pub workers: BTreeMap<WorkerId, WorkerHandle<I>>,
    /// Items claimed during the current run.
    pub seen: HashSet<I>,
    pub next_worker_id: u64,
    pub run_id: Option<Uuid>,
    pub started_at_ms: Option<u64>,
    pub options: RunOptions,
}

impl<I> PoolState<I> {
    pub fn active_count(&self) -> usize {
        self.workers
            .values()
            .filter(|w| w.state == WorkerState::Active)
            .count()
    }

    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            is_running: self.phase.is_running(),
            is_paused: self.paused,
        }
    }
}

/// Outcome of comparing the live worker set with the target.
#[derive(Debug, Default)]
pub(crate) struct ReconcilePlan {
    /// Fresh ids to spawn workers for.
    pub spawn: Vec<WorkerId>,
    /// Workers just marked `PendingClose`.
    pub close: Vec<WorkerId>,
}

/// What a worker should do next.
#[derive(Debug)]
pub(crate) enum Claim<I> {
    /// Process this item.
    Item(I),
    /// Popped an item already seen in this run; try again.
    Duplicate(I),
    /// The pool is paused; wait for resume.
    Paused,
    /// Marked for graceful close; exit now.
    Close,
    /// Nothing left; exit now.
    Exhausted,
}

/// State shared between the controller and every worker loop.
pub(crate) struct PoolCore<I> {
    pub queue: WorkQueue<I>,
    pub state: Mutex<PoolState<I>>,
    pub counters: PoolCounters,
    pub item_timeout: Duration,
    paused_tx: watch::Sender<bool>,
    status_tx: watch::Sender<PoolStatus>,
    events: broadcast::Sender<PoolEvent<I>>,
}

impl<I: WorkItem> PoolCore<I> {
    pub fn new(item_timeout: Duration, event_capacity: usize, options: RunOptions) -> Self {
        let (paused_tx, _) = watch::channel(false);
        let (status_tx, _) = watch::channel(PoolStatus::default());
        let (events, _) = broadcast::channel(event_capacity);
        Self {
            queue: WorkQueue::new(),
            state: Mutex::new(PoolState {
                phase: PoolPhase::NotStarted,
                paused: false,
                target: 0,
                workers: BTreeMap::new(),
                seen: HashSet::new(),
                next_worker_id: 0,
                run_id: None,
                started_at_ms: None,
                options,
            }),
            counters: PoolCounters::default(),
            item_timeout,
            paused_tx,
            status_tx,
            events,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PoolEvent<I>> {
        self.events.subscribe()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<PoolStatus> {
        self.status_tx.subscribe()
    }

    pub fn subscribe_paused(&self) -> watch::Receiver<bool> {
        self.paused_tx.subscribe()
    }

    /// Broadcast an event. Having no listener is not an error.
    pub fn emit(&self, event: PoolEvent<I>) {
        let _ = self.events.send(event);
    }

    /// Publish the status derived from `state` if it differs from the last
    /// published one. Must be called with the state lock held so that
    /// transitions are published in the order they happen.
    pub fn publish_status(&self, state: &PoolState<I>) {
        let status = state.status();
        let changed = self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
        if changed {
            info!(
                is_running = status.is_running,
                is_paused = status.is_paused,
                "pool status changed"
            );
            self.emit(PoolEvent::StatusChanged(status));
        }
    }

    pub fn set_paused(&self, paused: bool) {
        let mut state = self.state.lock();
        state.paused = paused;
        self.paused_tx.send_replace(paused);
        self.publish_status(&state);
    }

    pub fn options(&self) -> RunOptions {
        self.state.lock().options
    }

    /// Allocate `count` fresh worker ids.
    pub fn allocate_ids(state: &mut PoolState<I>, count: usize) -> Vec<WorkerId> {
        (0..count)
            .map(|_| {
                let id = WorkerId(state.next_worker_id);
                state.next_worker_id += 1;
                id
            })
            .collect()
    }

    /// Enter `Starting` for a new run: fresh run id, empty duplicate guard,
    /// pause cleared. Returns `false` when a run is already in progress.
    pub fn begin_start(&self, target: usize, options: RunOptions) -> bool {
        let mut state = self.state.lock();
        if state.phase.is_running() {
            return false;
        }
        let run_id = Uuid::new_v4();
        state.phase = PoolPhase::Starting;
        state.target = target;
        state.options = options;
        state.paused = false;
        state.seen.clear();
        state.run_id = Some(run_id);
        state.started_at_ms = Some(now_ms());
        self.paused_tx.send_replace(false);
        info!(%run_id, target_workers = target, "pool starting");
        self.publish_status(&state);
        true
    }

    /// Roll back a failed start.
    pub fn abort_start(&self) {
        let mut state = self.state.lock();
        state.phase = PoolPhase::NotStarted;
        state.run_id = None;
        state.started_at_ms = None;
        self.publish_status(&state);
    }

    /// Load the initial items and move to `Running`.
    pub fn enter_running(&self, items: Vec<I>) {
        let mut state = self.state.lock();
        self.queue.extend(items);
        state.phase = PoolPhase::Running;
        self.publish_status(&state);
    }

    pub fn set_target(&self, target: usize) {
        self.state.lock().target = target;
    }

    /// Compare the active worker count with the target. Returns the ids to
    /// spawn when under target; when over target, marks the most recently
    /// spawned active workers `PendingClose` and returns them.
    pub fn plan_reconcile(&self) -> ReconcilePlan {
        let mut state = self.state.lock();
        if state.phase != PoolPhase::Running {
            return ReconcilePlan::default();
        }
        let active = state.active_count();
        let target = state.target;
        if target > active {
            return ReconcilePlan {
                spawn: Self::allocate_ids(&mut state, target - active),
                close: Vec::new(),
            };
        }

        let close: Vec<WorkerId> = state
            .workers
            .iter_mut()
            .rev()
            .filter(|(_, w)| w.state == WorkerState::Active)
            .take(active - target)
            .map(|(id, w)| {
                w.state = WorkerState::PendingClose;
                *id
            })
            .collect();
        for id in &close {
            debug!(worker_id = %id, "worker marked for close");
            self.emit(PoolEvent::WorkerMarkedForClose(*id));
        }
        ReconcilePlan {
            spawn: Vec::new(),
            close,
        }
    }

    pub fn record_spawn_failure(&self) {
        self.counters.spawn_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Add a worker whose execution context is ready to the live set.
    /// Refused when the run ended while the context was being created.
    pub fn register(&self, id: WorkerId) -> bool {
        let mut state = self.state.lock();
        if state.phase != PoolPhase::Running {
            debug!(worker_id = %id, phase = ?state.phase, "pool no longer running, spawn dropped");
            return false;
        }
        state.workers.insert(
            id,
            WorkerHandle {
                state: WorkerState::Active,
                current_item: None,
            },
        );
        self.counters.workers_spawned.fetch_add(1, Ordering::Relaxed);
        self.emit(PoolEvent::WorkerSpawned(id));
        true
    }

    /// Decide the next step for `id`. Pause, close marks, queue emptiness,
    /// the pop and the duplicate guard are evaluated as one atomic step.
    pub fn claim_next(&self, id: WorkerId) -> Claim<I> {
        let mut state = self.state.lock();
        let paused = state.paused;
        let Some(handle) = state.workers.get_mut(&id) else {
            return Claim::Close;
        };
        if handle.state == WorkerState::PendingClose {
            handle.state = WorkerState::Closing;
            return Claim::Close;
        }
        if paused {
            return Claim::Paused;
        }

        let Some(item) = self.queue.pop() else {
            handle.state = WorkerState::Closing;
            return Claim::Exhausted;
        };

        if !state.seen.insert(item.clone()) {
            self.counters.duplicates_skipped.fetch_add(1, Ordering::Relaxed);
            self.emit(PoolEvent::DuplicateSkipped {
                worker: id,
                item: item.clone(),
            });
            return Claim::Duplicate(item);
        }

        if let Some(handle) = state.workers.get_mut(&id) {
            handle.current_item = Some(item.clone());
        }
        self.emit(PoolEvent::ItemStarted {
            worker: id,
            item: item.clone(),
        });
        Claim::Item(item)
    }

    /// Record the end of an item. Returns `true` when the worker was marked
    /// for graceful close and must exit now, whatever the outcome.
    pub fn finish_item(&self, id: WorkerId, item: I, outcome: ItemOutcome) -> bool {
        let counter = if outcome.is_success() {
            &self.counters.succeeded_items
        } else {
            &self.counters.failed_items
        };
        counter.fetch_add(1, Ordering::Relaxed);

        let mut state = self.state.lock();
        let close = match state.workers.get_mut(&id) {
            Some(handle) => {
                handle.current_item = None;
                if handle.state == WorkerState::PendingClose {
                    handle.state = WorkerState::Closing;
                    true
                } else {
                    false
                }
            }
            None => true,
        };
        self.emit(PoolEvent::ItemFinished {
            worker: id,
            item,
            outcome,
        });
        close
    }

    /// Remove a worker from the live set. The last worker to leave an empty
    /// queue moves the pool to `Drained`; this happens once per run.
    pub fn retire(&self, id: WorkerId, reason: CloseReason) {
        let mut state = self.state.lock();
        state.workers.remove(&id);
        self.emit(PoolEvent::WorkerClosed { worker: id, reason });
        debug!(worker_id = %id, ?reason, remaining = state.workers.len(), "worker closed");

        if state.workers.is_empty() && state.phase == PoolPhase::Running && self.queue.is_empty()
        {
            state.phase = PoolPhase::Drained;
            info!(run_id = ?state.run_id, "queue drained, all workers exited");
            self.publish_status(&state);
        }
    }

    pub fn snapshot_workers(&self) -> Vec<WorkerSnapshot<I>> {
        self.state
            .lock()
            .workers
            .iter()
            .map(|(id, handle)| WorkerSnapshot {
                id: *id,
                state: handle.state,
                current_item: handle.current_item.clone(),
            })
            .collect()
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        let pending_close = state
            .workers
            .values()
            .filter(|w| w.state == WorkerState::PendingClose)
            .count();
        let in_flight = state
            .workers
            .values()
            .filter(|w| w.current_item.is_some())
            .count();
        PoolStats {
            target: state.target,
            active_workers: state.active_count(),
            pending_close,
            in_flight,
            queued_items: self.queue.len(),
            succeeded_items: self.counters.succeeded_items.load(Ordering::Relaxed),
            failed_items: self.counters.failed_items.load(Ordering::Relaxed),
            duplicates_skipped: self.counters.duplicates_skipped.load(Ordering::Relaxed),
            workers_spawned: self.counters.workers_spawned.load(Ordering::Relaxed),
            spawn_failures: self.counters.spawn_failures.load(Ordering::Relaxed),
            run_id: state.run_id,
            run_started_at_ms: state.started_at_ms,
        }
    }
}
