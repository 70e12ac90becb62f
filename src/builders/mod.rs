//! Builders to construct pool controllers from configuration.

pub mod pool_builder;

pub use pool_builder::{build_scrape_pool, PoolBuilder};
