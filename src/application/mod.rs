// Application layer: use cases and orchestration over the repository.

mod dashboard;
pub mod error;
mod service;

pub use dashboard::*;
pub use error::*;
pub use service::*;
