use super::resources::{Resource, ResourceDescriptor, test_examples};
use super::tools::{Tool, ToolDescriptor};
use crate::application::dispatcher::{GenerationRequest, validate_request_data, validate_request_id};
use crate::application::metrics::{MetricsCollector, Outcome};
use crate::application::pipeline::GenerationPipeline;
use crate::constants::SERVER_NAME;
use crate::domain::{Artifact, JobKind, ServiceError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthReport {
    pub service: String,
    pub version: String,
    pub status: String,
    pub ready: bool,
    #[schema(value_type = String, format = DateTime)]
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub total_requests: u64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IntegrationScope {
    Image,
    Pdf,
    Both,
}

impl IntegrationScope {
    fn parse(value: Option<&Value>) -> Result<Self, ServiceError> {
        match value.and_then(Value::as_str) {
            Some("image") => Ok(Self::Image),
            Some("pdf") => Ok(Self::Pdf),
            Some("both") => Ok(Self::Both),
            _ => Err(ServiceError::validation(
                "test_type must be one of image, pdf, both",
            )),
        }
    }

    fn includes(self, kind: JobKind) -> bool {
        matches!(
            (self, kind),
            (Self::Both, _) | (Self::Image, JobKind::Image) | (Self::Pdf, JobKind::Document)
        )
    }
}

/// Static tool table plus the handlers behind it. Built once, never mutated.
pub struct ToolRegistry {
    descriptors: Vec<ToolDescriptor>,
    pipeline: Arc<GenerationPipeline>,
    metrics: Arc<MetricsCollector>,
}

impl ToolRegistry {
    pub fn new(pipeline: Arc<GenerationPipeline>, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            descriptors: Tool::ALL.into_iter().map(Tool::descriptor).collect(),
            pipeline,
            metrics,
        }
    }

    /// Every tool, in registration order.
    pub fn discover(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Run the named tool. Unknown names fail before any parameter checks and
    /// are not recorded; every resolved invocation is recorded exactly once.
    pub async fn dispatch(
        &self,
        name: &str,
        params: Value,
        cancel: &CancellationToken,
    ) -> Result<Value, ServiceError> {
        let tool = Tool::from_name(name).ok_or_else(|| ServiceError::UnknownTool(name.into()))?;
        let started = Instant::now();
        let result = self.invoke(tool, &params, cancel).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => {
                self.metrics.record(Outcome::Ok, duration_ms);
                info!(tool = name, duration_ms, "Tool invocation succeeded");
            }
            Err(error) => {
                self.metrics.record(Outcome::Error(error.kind()), duration_ms);
                warn!(tool = name, duration_ms, kind = %error.kind(), %error, "Tool invocation failed");
            }
        }
        result
    }

    async fn invoke(
        &self,
        tool: Tool,
        params: &Value,
        cancel: &CancellationToken,
    ) -> Result<Value, ServiceError> {
        match tool {
            Tool::GenerateImage => self.generate(JobKind::Image, params, cancel).await,
            Tool::ConvertHtmlToPdf => self.generate(JobKind::Document, params, cancel).await,
            Tool::ValidateRequest => validate(params),
            Tool::GetSystemMetrics => Ok(json!(self.metrics.snapshot())),
            Tool::RunIntegrationTest => self.integration_test(params, cancel).await,
        }
    }

    async fn generate(
        &self,
        kind: JobKind,
        params: &Value,
        cancel: &CancellationToken,
    ) -> Result<Value, ServiceError> {
        let request = GenerationRequest::parse(kind, params)?;
        let artifact = self.pipeline.run(&request, cancel).await?;
        Ok(generation_result(&artifact))
    }

    async fn integration_test(
        &self,
        params: &Value,
        cancel: &CancellationToken,
    ) -> Result<Value, ServiceError> {
        let fields = params
            .as_object()
            .ok_or_else(|| ServiceError::validation("params must be a JSON object"))?;
        let scope = IntegrationScope::parse(fields.get("test_type"))?;
        let request_id = fields
            .get("request_id")
            .and_then(Value::as_str)
            .ok_or_else(|| ServiceError::validation("request_id is required"))?;
        validate_request_id(request_id)?;

        let mut results = Vec::new();
        let validation = validate_request_data(params);
        let valid = validation.is_ok();
        results.push(step(
            "validation",
            valid,
            validation.unwrap_or_else(|message| message),
            None,
        ));

        if valid {
            for (kind, field, test) in [
                (JobKind::Image, "prompt", "image_processing"),
                (JobKind::Document, "html", "pdf_processing"),
            ] {
                if !scope.includes(kind) || !has_value(fields, field) {
                    continue;
                }
                match self.generate(kind, params, cancel).await {
                    Ok(data) => {
                        results.push(step(test, true, "Processed successfully".into(), Some(data)))
                    }
                    Err(ServiceError::Cancelled) => return Err(ServiceError::Cancelled),
                    Err(error) => results.push(step(
                        test,
                        false,
                        error.to_string(),
                        Some(json!({"errorDetail": error.detail()})),
                    )),
                }
            }
        }

        let total = results.len();
        let passed = results.iter().filter(|r| r["status"] == "passed").count();
        let all_passed = passed == total;
        Ok(json!({
            "status": if all_passed { "success" } else { "partial_failure" },
            "message": format!("Integration test completed - {passed}/{total} tests passed"),
            "overall_status": if all_passed { "passed" } else { "failed" },
            "test_results": results,
        }))
    }

    pub fn resources(&self) -> Vec<ResourceDescriptor> {
        Resource::ALL.into_iter().map(Resource::descriptor).collect()
    }

    pub fn read_resource(&self, uri: &str) -> Result<Value, ServiceError> {
        match Resource::from_uri(uri) {
            Some(Resource::Metrics) => Ok(json!(self.metrics.snapshot())),
            Some(Resource::Health) => Ok(json!(self.health())),
            Some(Resource::TestExamples) => Ok(test_examples()),
            None => Err(ServiceError::protocol(format!("unknown resource '{uri}'"))),
        }
    }

    pub fn health(&self) -> HealthReport {
        let snapshot = self.metrics.snapshot();
        HealthReport {
            service: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            status: "healthy".to_string(),
            ready: true,
            timestamp: Utc::now(),
            uptime_seconds: snapshot.uptime_seconds,
            total_requests: snapshot.total_recorded,
            success_rate: snapshot.success_rate,
        }
    }
}

/// Tool payload for a stored artifact. A missing remote copy is reported
/// through `remote_pending` together with the local path.
pub fn generation_result(artifact: &Artifact) -> Value {
    let mut result = match artifact.kind {
        JobKind::Image => json!({
            "status": "success",
            "image_url": artifact.public_path,
            "blob_url": artifact.remote_uri,
        }),
        JobKind::Document => json!({
            "status": "success",
            "pdf_blob_url": artifact.remote_uri,
        }),
    };
    if artifact.remote_pending {
        result["remote_pending"] = json!(true);
        if artifact.kind == JobKind::Document {
            result["pdf_url"] = json!(artifact.public_path);
        }
    }
    result
}

fn validate(params: &Value) -> Result<Value, ServiceError> {
    let data = params
        .get("request_data")
        .filter(|data| !data.is_null())
        .ok_or_else(|| ServiceError::validation("request_data is required"))?;
    let (is_valid, message) = match validate_request_data(data) {
        Ok(message) => (true, message),
        Err(message) => (false, message),
    };
    Ok(json!({"is_valid": is_valid, "message": message}))
}

fn has_value(fields: &Map<String, Value>, name: &str) -> bool {
    fields.get(name).is_some_and(|value| !value.is_null())
}

fn step(test: &str, passed: bool, message: String, data: Option<Value>) -> Value {
    let mut entry = json!({
        "test": test,
        "status": if passed { "passed" } else { "failed" },
        "message": message,
    });
    if let Some(data) = data {
        entry["data"] = data;
    }
    entry
}

