//! # Prometheus Scrape Pool
//!
//! A dynamically sized worker pool that drains a shared FIFO of work items
//! through a caller-supplied processing pipeline.
//!
//! Each worker owns an isolated execution context (a browser tab in the
//! scrape deployment) and processes one item at a time. The controller keeps
//! the number of live workers converged to a target that can change at any
//! moment, without interrupting an item in flight.
//!
//! ## Key Features
//!
//! - **Exactly-once dequeue**: concurrent pops never hand the same item to two workers,
//!   and an item re-queued by mistake within a run is skipped
//! - **Live resizing**: growing spawns workers with fresh contexts; shrinking marks the
//!   newest workers to close after their current item
//! - **Pause / resume**: workers hold before their next pop; resume can be delayed
//! - **Failure isolation**: pipeline errors, timeouts and panics abandon one item, never a worker
//! - **Drain detection**: `is_running` turns false exactly once, when the queue is empty
//!   and every worker has exited
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use prometheus_scrape_pool::config::{PoolConfig, RunOptions};
//! use prometheus_scrape_pool::core::PoolController;
//! use prometheus_scrape_pool::infra::StaticItemSource;
//! use prometheus_scrape_pool::runtime::TokioSpawner;
//!
//! let pool = PoolController::new(
//!     PoolConfig::from_env()?,
//!     Arc::new(StaticItemSource::new(["BHP".to_string(), "CBA".to_string()])),
//!     my_browser,    // implements ContextFactory
//!     my_pipeline,   // implements ProcessingPipeline
//!     TokioSpawner::current()?,
//! )?;
//!
//! pool.start(2, RunOptions::default()).await?;
//! pool.set_target(5).await?;
//! pool.pause();
//! pool.resume(Some(Duration::from_secs(3))).await;
//! pool.wait_until_drained().await;
//! ```
//!
//! For complete scenarios, see `tests/worker_pool_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling: queue, workers, controller and collaborator contracts.
pub mod core;
/// Configuration models for the pool, retry policies and run options.
pub mod config;
/// Builders to construct pool controllers from configuration.
pub mod builders;
/// Infrastructure adapters for item sources and persistence.
pub mod infra;
/// Runtime adapters and the control surface.
pub mod runtime;
/// Mock collaborators for tests and benches.
pub mod testing;
/// Shared utilities.
pub mod util;
