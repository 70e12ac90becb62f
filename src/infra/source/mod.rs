//! Item source adapters.

pub mod http;
pub mod memory;

pub use http::HttpItemSource;
pub use memory::StaticItemSource;
