use crate::application::dispatcher::{DEFAULT_DIMENSION, MAX_DIMENSION, MIN_DIMENSION};
use serde::Serialize;
use serde_json::{Value, json};
use utoipa::ToSchema;

const REQUEST_ID_PATTERN: &str = "^[A-Za-z0-9_-][A-Za-z0-9._-]{0,127}$";

/// Closed set of tools exposed through discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    GenerateImage,
    ConvertHtmlToPdf,
    ValidateRequest,
    GetSystemMetrics,
    RunIntegrationTest,
}

impl Tool {
    /// Registration order; discovery lists tools in exactly this order.
    pub const ALL: [Tool; 5] = [
        Tool::GenerateImage,
        Tool::ConvertHtmlToPdf,
        Tool::ValidateRequest,
        Tool::GetSystemMetrics,
        Tool::RunIntegrationTest,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Tool::GenerateImage => "generate_image",
            Tool::ConvertHtmlToPdf => "convert_html_to_pdf",
            Tool::ValidateRequest => "validate_request",
            Tool::GetSystemMetrics => "get_system_metrics",
            Tool::RunIntegrationTest => "run_integration_test",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    pub fn description(self) -> &'static str {
        match self {
            Tool::GenerateImage => {
                "Generate an image from a text prompt and store it locally and in blob storage"
            }
            Tool::ConvertHtmlToPdf => "Render an HTML document to PDF and store it in blob storage",
            Tool::ValidateRequest => "Validate request data structure and format without side effects",
            Tool::GetSystemMetrics => "Get current request outcome and latency metrics",
            Tool::RunIntegrationTest => {
                "Run validation plus image and/or PDF processing and report each step"
            }
        }
    }

    pub fn input_schema(self) -> Value {
        match self {
            Tool::GenerateImage => json!({
                "type": "object",
                "properties": {
                    "request_id": request_id_schema(),
                    "prompt": {"type": "string", "minLength": 1},
                    "width": dimension_schema(),
                    "height": dimension_schema()
                },
                "required": ["request_id", "prompt"]
            }),
            Tool::ConvertHtmlToPdf => json!({
                "type": "object",
                "properties": {
                    "request_id": request_id_schema(),
                    "html": {"type": "string", "minLength": 1}
                },
                "required": ["request_id", "html"]
            }),
            Tool::ValidateRequest => json!({
                "type": "object",
                "properties": {
                    "request_data": {
                        "type": "object",
                        "description": "Request data to validate"
                    }
                },
                "required": ["request_data"]
            }),
            Tool::GetSystemMetrics => json!({
                "type": "object",
                "properties": {}
            }),
            Tool::RunIntegrationTest => json!({
                "type": "object",
                "properties": {
                    "test_type": {"type": "string", "enum": ["image", "pdf", "both"]},
                    "request_id": request_id_schema(),
                    "prompt": {"type": "string"},
                    "html": {"type": "string"}
                },
                "required": ["test_type", "request_id"]
            }),
        }
    }

    pub fn output_schema(self) -> Value {
        match self {
            Tool::GenerateImage => json!({
                "type": "object",
                "properties": {
                    "status": {"type": "string", "enum": ["success"]},
                    "image_url": {"type": "string"},
                    "blob_url": {"type": ["string", "null"]},
                    "remote_pending": {"type": "boolean"}
                },
                "required": ["status", "image_url", "blob_url"]
            }),
            Tool::ConvertHtmlToPdf => json!({
                "type": "object",
                "properties": {
                    "status": {"type": "string", "enum": ["success"]},
                    "pdf_blob_url": {"type": ["string", "null"]},
                    "pdf_url": {"type": "string"},
                    "remote_pending": {"type": "boolean"}
                },
                "required": ["status", "pdf_blob_url"]
            }),
            Tool::ValidateRequest => json!({
                "type": "object",
                "properties": {
                    "is_valid": {"type": "boolean"},
                    "message": {"type": "string"}
                },
                "required": ["is_valid", "message"]
            }),
            Tool::GetSystemMetrics => json!({
                "type": "object",
                "properties": {
                    "count": {"type": "integer"},
                    "failure_count": {"type": "integer"},
                    "p50_latency_ms": {"type": "integer"},
                    "p95_latency_ms": {"type": "integer"},
                    "window_capacity": {"type": "integer"},
                    "total_recorded": {"type": "integer"},
                    "success_rate": {"type": "number"},
                    "errors_by_kind": {"type": "object"},
                    "uptime_seconds": {"type": "integer"},
                    "samples": {"type": "array"}
                },
                "required": ["count", "failure_count", "p50_latency_ms", "p95_latency_ms", "window_capacity"]
            }),
            Tool::RunIntegrationTest => json!({
                "type": "object",
                "properties": {
                    "status": {"type": "string", "enum": ["success", "partial_failure"]},
                    "message": {"type": "string"},
                    "overall_status": {"type": "string", "enum": ["passed", "failed"]},
                    "test_results": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "test": {"type": "string"},
                                "status": {"type": "string", "enum": ["passed", "failed"]},
                                "message": {"type": "string"},
                                "data": {"type": "object"}
                            },
                            "required": ["test", "status", "message"]
                        }
                    }
                },
                "required": ["status", "message", "overall_status", "test_results"]
            }),
        }
    }

    pub fn descriptor(self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
            output_schema: self.output_schema(),
        }
    }
}

fn request_id_schema() -> Value {
    json!({
        "type": "string",
        "pattern": REQUEST_ID_PATTERN,
        "description": "Caller-chosen id; also names the stored artifact"
    })
}

fn dimension_schema() -> Value {
    json!({
        "type": "integer",
        "minimum": MIN_DIMENSION,
        "maximum": MAX_DIMENSION,
        "default": DEFAULT_DIMENSION
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[schema(value_type = Object)]
    pub input_schema: Value,
    #[schema(value_type = Object)]
    pub output_schema: Value,
}
