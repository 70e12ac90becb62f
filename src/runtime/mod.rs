//! Runtime adapters and the control surface.

pub mod api;
pub mod tokio_spawner;

pub use api::{handle_request, ControlRequest, ControlResponse};
pub use tokio_spawner::TokioSpawner;
