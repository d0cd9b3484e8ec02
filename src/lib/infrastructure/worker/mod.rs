//! External generation worker: trait seam plus the HTTP implementation

pub mod http;
pub mod traits;
pub mod types;

pub use http::HttpWorker;
pub use traits::GenerationWorker;
pub use types::{RemoteState, WorkerError, WorkerRequest, WorkerStatus};
