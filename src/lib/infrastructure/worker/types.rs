//! Worker wire types and errors

use crate::domain::{JobKind, ServiceError};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Body submitted to `POST {base}/run`; serialised as `{"input": ...}`.
#[derive(Debug, Clone)]
pub struct WorkerRequest {
    pub kind: JobKind,
    pub input: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitResponse {
    #[serde(default)]
    pub id: Option<String>,
}

/// Job state as reported by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteState {
    InQueue,
    InProgress,
    Completed,
    Failed,
    Cancelled,
    TimedOut,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerStatus {
    pub status: RemoteState,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl WorkerStatus {
    pub fn new(status: RemoteState) -> Self {
        Self {
            status,
            output: None,
            error: None,
        }
    }

    pub fn completed(output: Value) -> Self {
        Self {
            status: RemoteState::Completed,
            output: Some(output),
            error: None,
        }
    }

    pub fn error_message(&self) -> String {
        match &self.error {
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => match self.status {
                RemoteState::Cancelled => "worker cancelled the job".to_string(),
                RemoteState::TimedOut => "worker timed out the job".to_string(),
                _ => "worker reported failure".to_string(),
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("worker '{worker}' rejected the credential (HTTP {status})")]
    Unauthorized { worker: String, status: u16 },
    #[error("network error calling worker '{worker}': {source}")]
    Network {
        worker: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("worker '{worker}' returned HTTP {status}: {body}")]
    Status {
        worker: String,
        status: u16,
        body: String,
    },
    #[error("worker '{worker}' returned invalid response: {reason}")]
    InvalidResponse { worker: String, reason: String },
}

impl WorkerError {
    pub fn network(worker: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            worker: worker.into(),
            source,
        }
    }

    pub fn invalid_response(worker: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            worker: worker.into(),
            reason: reason.into(),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            WorkerError::Unauthorized { status, .. } | WorkerError::Status { status, .. } => {
                Some(*status)
            }
            WorkerError::Network { source, .. } => source.status().map(|s| s.as_u16()),
            WorkerError::InvalidResponse { .. } => None,
        }
    }
}

impl From<WorkerError> for ServiceError {
    fn from(error: WorkerError) -> Self {
        match &error {
            WorkerError::Unauthorized { .. } => ServiceError::Auth(error.to_string()),
            _ => ServiceError::external(error.status_code(), error.to_string()),
        }
    }
}
