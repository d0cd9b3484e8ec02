use super::super::dto::{ConvertHtmlRequest, ErrorResponse, GenerateImageRequest, GenerationResponse};
use super::super::error::{ApiFailure, rejected};
use super::super::state::ServerState;
use super::run_tool;
use crate::application::tooling::Tool;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde_json::Value;
use std::sync::Arc;

#[utoipa::path(
    post,
    path = "/generate",
    tag = "generation",
    request_body = GenerateImageRequest,
    responses(
        (status = 200, description = "Image generated and stored", body = GenerationResponse),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 409, description = "request_id already in flight", body = ErrorResponse),
        (status = 502, description = "Image worker failed", body = ErrorResponse),
        (status = 504, description = "Image worker did not finish in time", body = ErrorResponse)
    )
)]
pub async fn generate_handler(
    State(state): State<Arc<ServerState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiFailure> {
    let Json(body) = body.map_err(rejected)?;
    run_tool(&state, Tool::GenerateImage.name(), body).await
}

#[utoipa::path(
    post,
    path = "/convert_html_to_pdf",
    tag = "generation",
    request_body = ConvertHtmlRequest,
    responses(
        (status = 200, description = "Document rendered and stored", body = GenerationResponse),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 409, description = "request_id already in flight", body = ErrorResponse),
        (status = 502, description = "Renderer failed", body = ErrorResponse),
        (status = 504, description = "Renderer did not finish in time", body = ErrorResponse)
    )
)]
pub async fn convert_handler(
    State(state): State<Arc<ServerState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiFailure> {
    let Json(body) = body.map_err(rejected)?;
    run_tool(&state, Tool::ConvertHtmlToPdf.name(), body).await
}
