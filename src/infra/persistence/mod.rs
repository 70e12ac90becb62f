//! Persistence adapters.

pub mod http;
pub mod memory;

pub use http::{HttpPersistence, SaveDataRequest};
pub use memory::InMemoryPersistence;
