use super::dto::{
    ConvertHtmlRequest, ErrorResponse, GenerateImageRequest, GenerationResponse,
    PersonaListResponse, ResourceListResponse, ToolListResponse,
};
use super::routes;
use crate::application::metrics::{MetricsSnapshot, Sample, SampleOutcome};
use crate::application::tooling::{HealthReport, ResourceDescriptor, ToolDescriptor};
use crate::config::PersonaDescriptor;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::status::health_handler,
        routes::status::stats_handler,
        routes::status::personas_handler,
        routes::generate::generate_handler,
        routes::generate::convert_handler,
        routes::tools::tools_handler,
        routes::tools::invoke_handler,
        routes::tools::resources_handler
    ),
    components(
        schemas(
            GenerateImageRequest,
            ConvertHtmlRequest,
            GenerationResponse,
            ErrorResponse,
            ToolListResponse,
            ToolDescriptor,
            ResourceListResponse,
            ResourceDescriptor,
            PersonaListResponse,
            PersonaDescriptor,
            HealthReport,
            MetricsSnapshot,
            Sample,
            SampleOutcome
        )
    ),
    tags(
        (name = "generation", description = "Image generation and HTML to PDF rendering"),
        (name = "tools", description = "Tool discovery and generic invocation"),
        (name = "status", description = "Health, metrics and personas")
    )
)]
pub(super) struct ApiDoc;
