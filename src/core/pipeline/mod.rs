//! Per-item processing: failure taxonomy, bounded polling and the readiness
//! pipeline used by the scrape deployment.

pub mod poll;
pub mod readiness;

use thiserror::Error;

pub use poll::{poll_until, PollOutcome};
pub use readiness::{PageContext, Readiness, ReadinessPipeline};

/// Failures of a single item. None of them stops a worker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// Loading the page into the execution context failed.
    #[error("navigation failed: {0}")]
    Navigation(String),
    /// An anti-automation challenge was still showing after the last poll.
    #[error("anti-automation challenge did not clear after {attempts} attempts")]
    ChallengeNotCleared {
        /// Number of polls performed.
        attempts: u32,
    },
    /// The page never showed the expected content.
    #[error("expected content not found")]
    ContentMissing,
    /// Field extraction failed.
    #[error("extraction failed: {0}")]
    Extraction(String),
    /// A secondary artifact could not be downloaded.
    #[error("download failed: {0}")]
    Download(String),
    /// The persistence collaborator rejected or lost a record.
    #[error("persistence failed: {0}")]
    Persistence(String),
    /// The execution context itself misbehaved.
    #[error("execution context failure: {0}")]
    Context(String),
}
