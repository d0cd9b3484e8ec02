use crate::application::tooling::{ResourceDescriptor, ToolDescriptor};
use crate::config::PersonaDescriptor;
use crate::domain::{ErrorDetail, ServiceError};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GenerateImageRequest {
    /// Names the artifact; generated when absent.
    pub request_id: Option<String>,
    pub prompt: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConvertHtmlRequest {
    pub request_id: Option<String>,
    pub html: String,
}

/// Result of a generation tool. Image results carry `image_url` and
/// `blob_url`, document results carry `pdf_blob_url`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GenerationResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_blob_url: Option<String>,
    /// Local fallback when the remote copy could not be written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_pending: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub status: String,
    pub error: String,
    #[serde(rename = "errorDetail")]
    #[schema(value_type = Object)]
    pub error_detail: ErrorDetail,
}

impl ErrorResponse {
    pub fn from_error(error: &ServiceError) -> Self {
        Self {
            status: "error".to_string(),
            error: error.user_message(),
            error_detail: error.detail(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ToolListResponse {
    pub tools: Vec<ToolDescriptor>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ResourceListResponse {
    pub resources: Vec<ResourceDescriptor>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PersonaListResponse {
    pub personas: Vec<PersonaDescriptor>,
}
