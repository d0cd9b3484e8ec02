//! Submit, poll, normalize and persist one generation request

use super::artifacts::ArtifactStore;
use super::dispatcher::{GenerationRequest, JobDispatcher};
use super::normalizer::ResultNormalizer;
use super::poller::{PollPolicy, await_completion};
use crate::domain::{Artifact, Job, JobHandle, JobStatus, ServiceError};
use crate::infrastructure::worker::GenerationWorker;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct GenerationPipeline {
    dispatcher: JobDispatcher,
    normalizer: ResultNormalizer,
    artifacts: ArtifactStore,
    policy: PollPolicy,
}

impl GenerationPipeline {
    pub fn new(
        dispatcher: JobDispatcher,
        normalizer: ResultNormalizer,
        artifacts: ArtifactStore,
        policy: PollPolicy,
    ) -> Self {
        Self {
            dispatcher,
            normalizer,
            artifacts,
            policy,
        }
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Run `request` end to end. An artifact exists only if the job succeeded.
    pub async fn run(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<Artifact, ServiceError> {
        if cancel.is_cancelled() {
            return Err(ServiceError::Cancelled);
        }
        let handle = self.dispatcher.submit_request(request).await?;
        let worker = self.dispatcher.worker(request.kind()).as_ref();
        let job = await_completion(worker, handle.clone(), self.policy, cancel).await?;

        match job.status {
            JobStatus::Succeeded => {}
            JobStatus::TimedOut => {
                abandon(worker, &handle).await;
                return Err(ServiceError::Timeout {
                    job: handle.external_id,
                    attempts: job.attempts,
                    waited_ms: waited_ms(&job),
                });
            }
            _ if job.is_cancelled() => {
                abandon(worker, &handle).await;
                return Err(ServiceError::Cancelled);
            }
            _ => {
                let reason = job.failure_reason.as_deref().unwrap_or("unknown failure");
                return Err(ServiceError::external(
                    None,
                    format!("job {} failed: {reason}", handle.external_id),
                ));
            }
        }

        let buffer = self.normalizer.normalize(&job).await?;
        let artifact = self
            .artifacts
            .persist(&buffer, request.kind(), request.request_id())
            .await?;
        info!(
            request_id = request.request_id(),
            job = %job.id,
            attempts = job.attempts,
            "Generation finished"
        );
        Ok(artifact)
    }
}

/// Best-effort cancel of a job nobody is waiting for any more.
async fn abandon(worker: &dyn GenerationWorker, handle: &JobHandle) {
    if let Err(error) = worker.cancel(&handle.external_id).await {
        warn!(
            worker = worker.id(),
            external_id = handle.external_id.as_str(),
            %error,
            "Failed to cancel abandoned job"
        );
    }
}

fn waited_ms(job: &Job) -> u64 {
    job.completed_at
        .map(|done| (done - job.submitted_at).num_milliseconds().max(0) as u64)
        .unwrap_or_default()
}
