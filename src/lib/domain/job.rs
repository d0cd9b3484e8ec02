use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Which backend a job targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Image,
    Document,
}

impl JobKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::Image => "image",
            JobKind::Document => "document",
        }
    }

    /// File extension used for persisted artifacts of this kind.
    pub fn extension(self) -> &'static str {
        match self {
            JobKind::Image => "png",
            JobKind::Document => "pdf",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            JobKind::Image => "image/png",
            JobKind::Document => "application/pdf",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque identifier returned by the external worker on submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle {
    pub kind: JobKind,
    pub external_id: String,
}

impl JobHandle {
    pub fn new(kind: JobKind, external_id: impl Into<String>) -> Self {
        Self {
            kind,
            external_id: external_id.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    TimedOut,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::TimedOut
        )
    }

    fn rank(self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Running => 1,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::TimedOut => 2,
        }
    }
}

/// Rejected status change; terminal states are final and status never moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid job transition from {from:?} to {to:?}")]
pub struct InvalidTransition {
    pub from: JobStatus,
    pub to: JobStatus,
}

/// One external generation request and its lifecycle.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    pub kind: JobKind,
    pub external_handle: JobHandle,
    pub status: JobStatus,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_ref: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub attempts: u32,
    #[serde(skip)]
    cancelled: bool,
}

impl Job {
    pub fn new(handle: JobHandle) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: handle.kind,
            external_handle: handle,
            status: JobStatus::Pending,
            submitted_at: Utc::now(),
            completed_at: None,
            result_ref: None,
            failure_reason: None,
            attempts: 0,
            cancelled: false,
        }
    }

    /// Move to `next`. Repeating the current non-terminal state is a no-op.
    pub fn transition(&mut self, next: JobStatus) -> Result<(), InvalidTransition> {
        if self.status == next && !next.is_terminal() {
            return Ok(());
        }
        if self.status.is_terminal() || next.rank() <= self.status.rank() {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    pub fn succeed(&mut self, output: Value) -> Result<(), InvalidTransition> {
        self.transition(JobStatus::Succeeded)?;
        self.result_ref = Some(output);
        Ok(())
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), InvalidTransition> {
        self.transition(JobStatus::Failed)?;
        self.failure_reason = Some(reason.into());
        Ok(())
    }

    pub fn time_out(&mut self) -> Result<(), InvalidTransition> {
        self.transition(JobStatus::TimedOut)
    }

    /// Fail the job because the caller stopped waiting. Only this marks the
    /// job cancelled; a worker-reported failure never does, whatever its text.
    pub fn cancel(&mut self) -> Result<(), InvalidTransition> {
        self.fail(CANCELLED_REASON)?;
        self.cancelled = true;
        Ok(())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

const CANCELLED_REASON: &str = "cancelled";
