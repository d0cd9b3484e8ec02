use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error taxonomy surfaced in every response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorKind {
    ValidationError,
    ExternalServiceError,
    TimeoutError,
    StorageError,
    ProtocolError,
    AuthError,
    CancelledError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::ExternalServiceError => "ExternalServiceError",
            ErrorKind::TimeoutError => "TimeoutError",
            ErrorKind::StorageError => "StorageError",
            ErrorKind::ProtocolError => "ProtocolError",
            ErrorKind::AuthError => "AuthError",
            ErrorKind::CancelledError => "CancelledError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire form of a failure: `{kind, message}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid parameters: {0}")]
    Validation(String),
    #[error("external service error: {message}")]
    ExternalService {
        status: Option<u16>,
        message: String,
    },
    #[error("job '{job}' did not finish after {attempts} poll attempts ({waited_ms} ms)")]
    Timeout {
        job: String,
        attempts: u32,
        waited_ms: u64,
    },
    #[error("storage error: {0}")]
    Storage(String),
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("requestId '{0}' is already in flight")]
    DuplicateRequest(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("invocation cancelled")]
    Cancelled,
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub fn external(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::ExternalService {
            status,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Validation(_) => ErrorKind::ValidationError,
            ServiceError::ExternalService { .. } => ErrorKind::ExternalServiceError,
            ServiceError::Timeout { .. } => ErrorKind::TimeoutError,
            ServiceError::Storage(_) => ErrorKind::StorageError,
            ServiceError::UnknownTool(_)
            | ServiceError::DuplicateRequest(_)
            | ServiceError::Protocol(_) => ErrorKind::ProtocolError,
            ServiceError::Auth(_) => ErrorKind::AuthError,
            ServiceError::Cancelled => ErrorKind::CancelledError,
        }
    }

    pub fn detail(&self) -> ErrorDetail {
        ErrorDetail {
            kind: self.kind(),
            message: self.to_string(),
        }
    }

    /// Message suitable for a human operator.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::Validation(message) => format!("The request is invalid: {message}."),
            ServiceError::ExternalService {
                status: Some(429), ..
            } => "Too many requests. Please try again in a few minutes.".to_string(),
            ServiceError::ExternalService { .. } => {
                "The generation service is temporarily unavailable. Please try again later."
                    .to_string()
            }
            ServiceError::Timeout { .. } => {
                "The generation service did not finish in time. Please try again.".to_string()
            }
            ServiceError::Storage(_) => {
                "The result could not be stored. Please contact the administrator.".to_string()
            }
            ServiceError::UnknownTool(name) => format!("Tool \"{name}\" is not available."),
            ServiceError::DuplicateRequest(id) => {
                format!("A request with id \"{id}\" is already being processed.")
            }
            ServiceError::Protocol(message) => format!("Malformed request: {message}."),
            ServiceError::Auth(_) => {
                "The generation service is not properly configured. Please contact the administrator."
                    .to_string()
            }
            ServiceError::Cancelled => "The request was cancelled.".to_string(),
        }
    }
}
