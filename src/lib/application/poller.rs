//! Poller: bounded exponential backoff over a worker's status endpoint

use crate::config::PollSettings;
use crate::domain::{InvalidTransition, Job, JobHandle, JobStatus, ServiceError};
use crate::infrastructure::worker::{GenerationWorker, RemoteState};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl PollPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Wait before attempt `attempt` (1-indexed): `min(base * 2^(attempt-1), max)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << exponent)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Total wait before a `timedOut` verdict.
    pub fn worst_case_wait(&self) -> Duration {
        (1..=self.max_attempts)
            .map(|attempt| self.delay_for(attempt))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

impl From<&PollSettings> for PollPolicy {
    fn from(settings: &PollSettings) -> Self {
        Self::new(
            settings.max_attempts,
            settings.base_delay(),
            settings.max_delay(),
        )
    }
}

/// Poll `handle` until the worker reports a terminal state, the attempts run
/// out (`TimedOut`) or `cancel` fires (`Failed` with reason `cancelled`).
///
/// Transport errors while polling are returned immediately.
pub async fn await_completion(
    worker: &dyn GenerationWorker,
    handle: JobHandle,
    policy: PollPolicy,
    cancel: &CancellationToken,
) -> Result<Job, ServiceError> {
    let mut job = Job::new(handle);

    for attempt in 1..=policy.max_attempts {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(job = %job.id, attempt, "Polling cancelled");
                settle(&mut job, Job::cancel);
                return Ok(job);
            }
            _ = sleep(policy.delay_for(attempt)) => {}
        }

        job.attempts = attempt;
        let report = worker.status(&job.external_handle.external_id).await?;
        debug!(
            job = %job.id,
            external_id = job.external_handle.external_id.as_str(),
            attempt,
            state = ?report.status,
            "Polled worker"
        );

        match report.status {
            RemoteState::InQueue => {}
            RemoteState::InProgress => settle(&mut job, |job| job.transition(JobStatus::Running)),
            RemoteState::Completed => {
                let output = report.output.unwrap_or_default();
                settle(&mut job, |job| job.succeed(output));
                return Ok(job);
            }
            RemoteState::Failed | RemoteState::Cancelled | RemoteState::TimedOut => {
                let reason = report.error_message();
                settle(&mut job, |job| job.fail(reason));
                return Ok(job);
            }
            RemoteState::Unknown => {
                warn!(job = %job.id, attempt, "Worker reported an unrecognised status")
            }
        }
    }

    info!(job = %job.id, attempts = job.attempts, "Polling exhausted");
    settle(&mut job, Job::time_out);
    Ok(job)
}

fn settle<F>(job: &mut Job, change: F)
where
    F: FnOnce(&mut Job) -> Result<(), InvalidTransition>,
{
    if let Err(error) = change(job) {
        warn!(job = %job.id, %error, "Ignoring job status change");
    }
}
