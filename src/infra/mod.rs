//! Infrastructure adapters: where items come from and where results go.

pub mod persistence;
pub mod source;

pub use persistence::{HttpPersistence, InMemoryPersistence};
pub use source::{HttpItemSource, StaticItemSource};
