//! Configuration models for the pool, retry policies and run options.

pub mod pool;

pub use pool::{PoolConfig, RetryPolicy, RunOptions, ENV_PREFIX, ITEM_PLACEHOLDER};
