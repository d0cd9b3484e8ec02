//! Worker traits

use super::types::{WorkerError, WorkerRequest, WorkerStatus};
use async_trait::async_trait;

/// Contract expected from an external generation backend: submit, poll, cancel.
#[async_trait]
pub trait GenerationWorker: Send + Sync {
    /// Identifier used in logs and error messages
    fn id(&self) -> &str;

    /// Submit a job and return the worker's opaque job id
    async fn submit(&self, request: &WorkerRequest) -> Result<String, WorkerError>;

    /// Query the current state of a submitted job
    async fn status(&self, external_id: &str) -> Result<WorkerStatus, WorkerError>;

    /// Ask the worker to abandon a job. Best effort.
    async fn cancel(&self, _external_id: &str) -> Result<(), WorkerError> {
        Ok(())
    }
}
