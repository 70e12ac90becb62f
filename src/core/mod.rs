//! Core scheduling: queue, worker lifecycle, controller and the collaborator
//! contracts the pool drives.

pub mod controller;
pub mod error;
pub mod executor;
pub mod pipeline;
pub mod queue;
pub mod record;
pub mod state;
mod worker;

pub use controller::{PoolController, Reconciled};
pub use error::{AppResult, PoolError};
pub use executor::{ContextFactory, ExecutionContext, ItemSource, ProcessingPipeline, Spawn, WorkItem};
pub use pipeline::{PageContext, PipelineError, Readiness, ReadinessPipeline};
pub use queue::WorkQueue;
pub use record::{
    Category, DirectorInterest, DirectorTransaction, HistoricalArtifact, PersistRecord,
    Persistence, ScrapedPage,
};
pub use state::{
    CloseReason, ItemOutcome, PoolEvent, PoolPhase, PoolStats, PoolStatus, WorkerId,
    WorkerSnapshot, WorkerState,
};
