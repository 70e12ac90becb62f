//! Mock processing pipeline.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::config::RunOptions;
use crate::core::{ExecutionContext, PipelineError, ProcessingPipeline, WorkItem};

/// Per-item behaviour of a [`MockPipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehaviour {
    /// Report a pipeline failure.
    Fail,
    /// Panic inside the pipeline.
    Panic,
    /// Never finish.
    Hang,
}

#[derive(Debug)]
struct Inner<I> {
    delay: Mutex<Duration>,
    behaviours: Mutex<HashMap<I, MockBehaviour>>,
    started: Mutex<Vec<I>>,
    finished: Mutex<Vec<I>>,
    gate: watch::Sender<bool>,
    in_flight: watch::Sender<usize>,
    max_in_flight: AtomicUsize,
}

/// Pipeline double that records what it processed and how concurrently.
///
/// Clones share state. The gate holds every item mid-processing until
/// released, which lets tests change the pool while all workers are busy.
///
/// ```rust,ignore
/// let pipeline = MockPipeline::new();
/// pipeline.hold();
/// pool.start(3, RunOptions::default()).await?;
/// pipeline.wait_in_flight(3).await;
/// pool.set_target(1).await?;
/// pipeline.release();
/// ```
#[derive(Debug)]
pub struct MockPipeline<I> {
    inner: Arc<Inner<I>>,
}

impl<I> Clone for MockPipeline<I> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<I: WorkItem> Default for MockPipeline<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: WorkItem> MockPipeline<I> {
    /// A pipeline that succeeds immediately for every item.
    #[must_use]
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        let (in_flight, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                delay: Mutex::new(Duration::ZERO),
                behaviours: Mutex::new(HashMap::new()),
                started: Mutex::new(Vec::new()),
                finished: Mutex::new(Vec::new()),
                gate,
                in_flight,
                max_in_flight: AtomicUsize::new(0),
            }),
        }
    }

    /// Spend `delay` on every item.
    #[must_use]
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.inner.delay.lock() = delay;
        self
    }

    /// Set how `item` behaves.
    pub fn set_behaviour(&self, item: I, behaviour: MockBehaviour) {
        self.inner.behaviours.lock().insert(item, behaviour);
    }

    /// Hold every item that starts from now on.
    pub fn hold(&self) {
        self.inner.gate.send_replace(false);
    }

    /// Let held items continue.
    pub fn release(&self) {
        self.inner.gate.send_replace(true);
    }

    /// Wait until at least `count` items are being processed.
    pub async fn wait_in_flight(&self, count: usize) {
        let mut rx = self.inner.in_flight.subscribe();
        let _ = rx.wait_for(|n| *n >= count).await;
    }

    /// Wait until at least `count` items have finished, whatever the outcome.
    pub async fn wait_finished(&self, count: usize) {
        let mut rx = self.inner.in_flight.subscribe();
        loop {
            if self.inner.finished.lock().len() >= count {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Items in the order processing started.
    pub fn started(&self) -> Vec<I> {
        self.inner.started.lock().clone()
    }

    /// Items in the order processing ended, including failures and panics.
    pub fn finished(&self) -> Vec<I> {
        self.inner.finished.lock().clone()
    }

    /// Items being processed right now.
    pub fn in_flight(&self) -> usize {
        *self.inner.in_flight.borrow()
    }

    /// Highest concurrency observed.
    pub fn max_in_flight(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }

    /// Items that were handed to the pipeline more than once.
    pub fn duplicates(&self) -> Vec<I> {
        let mut seen = HashSet::new();
        self.inner
            .started
            .lock()
            .iter()
            .filter(|item| !seen.insert((*item).clone()))
            .cloned()
            .collect()
    }
}

/// Marks an item finished however the processing future ends: completion,
/// panic unwind or being dropped by a timeout.
struct InFlight<I: WorkItem> {
    inner: Arc<Inner<I>>,
    item: I,
}

impl<I: WorkItem> InFlight<I> {
    fn enter(inner: &Arc<Inner<I>>, item: &I) -> Self {
        inner.started.lock().push(item.clone());
        let mut now = 0;
        inner.in_flight.send_modify(|n| {
            *n += 1;
            now = *n;
        });
        inner.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self {
            inner: Arc::clone(inner),
            item: item.clone(),
        }
    }
}

impl<I: WorkItem> Drop for InFlight<I> {
    fn drop(&mut self) {
        self.inner.finished.lock().push(self.item.clone());
        self.inner.in_flight.send_modify(|n| *n = n.saturating_sub(1));
    }
}

#[async_trait]
impl<I, C> ProcessingPipeline<I, C> for MockPipeline<I>
where
    I: WorkItem,
    C: ExecutionContext,
{
    async fn process(
        &self,
        item: &I,
        _ctx: &mut C,
        _options: &RunOptions,
    ) -> Result<(), PipelineError> {
        let _in_flight = InFlight::enter(&self.inner, item);

        let mut gate = self.inner.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        let delay = *self.inner.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let behaviour = self.inner.behaviours.lock().get(item).copied();
        match behaviour {
            None => Ok(()),
            Some(MockBehaviour::Fail) => {
                Err(PipelineError::Extraction(format!("mock failure for {item}")))
            }
            Some(MockBehaviour::Panic) => panic!("mock pipeline panicked on {item}"),
            Some(MockBehaviour::Hang) => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}
