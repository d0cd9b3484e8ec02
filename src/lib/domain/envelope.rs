use super::error::{ErrorDetail, ServiceError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Operation selector of a native request envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Discover,
    Invoke,
    Cancel,
    Resources,
    ReadResource,
}

/// One line of the native stdio protocol.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    pub op: Operation,
    #[serde(alias = "request_id")]
    pub request_id: String,
    #[serde(default, alias = "tool_name")]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub params: Value,
    #[serde(skip, default = "Utc::now")]
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    Ok,
    Error,
}

/// Reply correlated to its request solely through `request_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub request_id: Option<String>,
    pub status: EnvelopeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<ErrorDetail>,
}

impl ResponseEnvelope {
    pub fn ok(request_id: impl Into<String>, payload: Value) -> Self {
        Self {
            request_id: Some(request_id.into()),
            status: EnvelopeStatus::Ok,
            payload: Some(payload),
            error_detail: None,
        }
    }

    pub fn error(request_id: Option<String>, error: &ServiceError) -> Self {
        Self {
            request_id,
            status: EnvelopeStatus::Error,
            payload: None,
            error_detail: Some(error.detail()),
        }
    }

    pub fn from_result(request_id: impl Into<String>, result: Result<Value, ServiceError>) -> Self {
        match result {
            Ok(payload) => Self::ok(request_id, payload),
            Err(error) => Self::error(Some(request_id.into()), &error),
        }
    }
}
