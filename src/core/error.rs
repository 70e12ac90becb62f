//! Error types for scheduler operations.

use thiserror::Error;

/// Errors produced by the pool controller and its infrastructure collaborators.
///
/// Per-item failures never surface here; they are reported as
/// [`PipelineError`](crate::core::pipeline::PipelineError) and absorbed by the
/// worker loop.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The upstream item source could not be reached or returned garbage.
    #[error("item source failed: {0}")]
    ItemSource(String),
    /// The item source answered but had nothing to schedule.
    #[error("item source returned no items")]
    NoItems,
    /// An execution context could not be created for a new worker.
    #[error("execution context creation failed: {0}")]
    ContextCreation(String),
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A builder was finalized without a required component.
    #[error("missing component: {0}")]
    MissingComponent(&'static str),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
