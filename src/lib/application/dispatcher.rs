//! Job Dispatcher: typed generation requests and their submission to a worker

use crate::domain::{JobHandle, JobKind, ServiceError};
use crate::infrastructure::worker::{GenerationWorker, WorkerRequest};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_DIMENSION: u32 = 512;
pub const MIN_DIMENSION: u32 = 64;
pub const MAX_DIMENSION: u32 = 2048;
pub const MAX_REQUEST_ID_LEN: usize = 128;

/// `request_id` names the artifact file, so it must be a safe file stem.
pub fn validate_request_id(request_id: &str) -> Result<(), ServiceError> {
    if request_id.is_empty() {
        return Err(ServiceError::validation("request_id must not be empty"));
    }
    if request_id.len() > MAX_REQUEST_ID_LEN {
        return Err(ServiceError::validation(format!(
            "request_id must be at most {MAX_REQUEST_ID_LEN} characters"
        )));
    }
    if request_id.starts_with('.') {
        return Err(ServiceError::validation("request_id must not start with '.'"));
    }
    if let Some(bad) = request_id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(ServiceError::validation(format!(
            "request_id contains unsupported character '{bad}'"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageParams {
    pub request_id: String,
    pub prompt: String,
    pub width: u32,
    pub height: u32,
}

impl ImageParams {
    pub fn from_value(params: &Value) -> Result<Self, ServiceError> {
        let fields = as_object(params)?;
        let request_id = required_str(fields, "request_id")?;
        validate_request_id(&request_id)?;
        let prompt = required_str(fields, "prompt")?;
        Ok(Self {
            request_id,
            prompt,
            width: dimension(fields, "width")?,
            height: dimension(fields, "height")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentParams {
    pub request_id: String,
    pub html: String,
}

impl DocumentParams {
    pub fn from_value(params: &Value) -> Result<Self, ServiceError> {
        let fields = as_object(params)?;
        let request_id = required_str(fields, "request_id")?;
        validate_request_id(&request_id)?;
        let html = required_str(fields, "html")?;
        Ok(Self { request_id, html })
    }
}

/// Validated input for one external generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationRequest {
    Image(ImageParams),
    Document(DocumentParams),
}

impl GenerationRequest {
    /// Check `params` against the input schema of `kind`.
    pub fn parse(kind: JobKind, params: &Value) -> Result<Self, ServiceError> {
        match kind {
            JobKind::Image => ImageParams::from_value(params).map(Self::Image),
            JobKind::Document => DocumentParams::from_value(params).map(Self::Document),
        }
    }

    pub fn kind(&self) -> JobKind {
        match self {
            GenerationRequest::Image(_) => JobKind::Image,
            GenerationRequest::Document(_) => JobKind::Document,
        }
    }

    pub fn request_id(&self) -> &str {
        match self {
            GenerationRequest::Image(params) => &params.request_id,
            GenerationRequest::Document(params) => &params.request_id,
        }
    }

    pub fn to_worker_request(&self) -> WorkerRequest {
        let input = match self {
            GenerationRequest::Image(params) => json!({
                "prompt": params.prompt,
                "width": params.width,
                "height": params.height,
            }),
            GenerationRequest::Document(params) => json!({
                "html": params.html,
                "format": "pdf",
            }),
        };
        WorkerRequest {
            kind: self.kind(),
            input,
        }
    }
}

/// Validate a free-form request body the way `validate_request` reports it:
/// `Ok(message)` when valid, `Err(message)` otherwise. Never calls a worker.
pub fn validate_request_data(data: &Value) -> Result<String, String> {
    let fields = data
        .as_object()
        .ok_or_else(|| "request data must be a JSON object".to_string())?;
    let has_prompt = fields.get("prompt").is_some_and(|v| !v.is_null());
    let has_html = fields.get("html").is_some_and(|v| !v.is_null());
    if !has_prompt && !has_html {
        return Err("request must carry either a prompt or html".to_string());
    }
    if has_prompt {
        ImageParams::from_value(data).map_err(|e| e.to_string())?;
    }
    if has_html {
        DocumentParams::from_value(data).map_err(|e| e.to_string())?;
    }
    Ok("Request data is valid".to_string())
}

fn as_object(params: &Value) -> Result<&Map<String, Value>, ServiceError> {
    params
        .as_object()
        .ok_or_else(|| ServiceError::validation("params must be a JSON object"))
}

fn required_str(fields: &Map<String, Value>, name: &str) -> Result<String, ServiceError> {
    match fields.get(name) {
        Some(Value::String(value)) if !value.trim().is_empty() => Ok(value.clone()),
        Some(Value::String(_)) => Err(ServiceError::validation(format!(
            "{name} must not be blank"
        ))),
        Some(Value::Null) | None => Err(ServiceError::validation(format!("{name} is required"))),
        Some(_) => Err(ServiceError::validation(format!("{name} must be a string"))),
    }
}

fn dimension(fields: &Map<String, Value>, name: &str) -> Result<u32, ServiceError> {
    let value = match fields.get(name) {
        None | Some(Value::Null) => return Ok(DEFAULT_DIMENSION),
        Some(value) => value,
    };
    let number = value
        .as_u64()
        .ok_or_else(|| ServiceError::validation(format!("{name} must be a positive integer")))?;
    if !(u64::from(MIN_DIMENSION)..=u64::from(MAX_DIMENSION)).contains(&number) {
        return Err(ServiceError::validation(format!(
            "{name} must be between {MIN_DIMENSION} and {MAX_DIMENSION}"
        )));
    }
    Ok(number as u32)
}

/// Routes requests to the image worker or the document renderer.
#[derive(Clone)]
pub struct JobDispatcher {
    image: Arc<dyn GenerationWorker>,
    document: Arc<dyn GenerationWorker>,
}

impl JobDispatcher {
    pub fn new(image: Arc<dyn GenerationWorker>, document: Arc<dyn GenerationWorker>) -> Self {
        Self { image, document }
    }

    pub fn worker(&self, kind: JobKind) -> &Arc<dyn GenerationWorker> {
        match kind {
            JobKind::Image => &self.image,
            JobKind::Document => &self.document,
        }
    }

    /// Validate `params` and submit them. Invalid input never reaches the worker.
    pub async fn submit(&self, kind: JobKind, params: &Value) -> Result<JobHandle, ServiceError> {
        let request = GenerationRequest::parse(kind, params)?;
        self.submit_request(&request).await
    }

    /// Submit an already validated request. No retry on failure.
    pub async fn submit_request(
        &self,
        request: &GenerationRequest,
    ) -> Result<JobHandle, ServiceError> {
        let kind = request.kind();
        let worker = self.worker(kind);
        debug!(worker = worker.id(), request_id = request.request_id(), "Submitting job");
        let external_id = worker.submit(&request.to_worker_request()).await?;
        info!(
            worker = worker.id(),
            request_id = request.request_id(),
            external_id = external_id.as_str(),
            "Job accepted by worker"
        );
        Ok(JobHandle::new(kind, external_id))
    }
}
