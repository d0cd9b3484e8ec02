use super::super::dto::{ErrorResponse, ResourceListResponse, ToolListResponse};
use super::super::error::{ApiFailure, rejected};
use super::super::state::ServerState;
use super::run_tool;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

#[utoipa::path(
    get,
    path = "/tools",
    tag = "tools",
    responses((status = 200, description = "Registered tools in registration order", body = ToolListResponse))
)]
pub async fn tools_handler(State(state): State<Arc<ServerState>>) -> Json<ToolListResponse> {
    let tools = state.gateway().discover().to_vec();
    debug!(tool_count = tools.len(), "Serving /tools request");
    Json(ToolListResponse { tools })
}

#[utoipa::path(
    post,
    path = "/tools/{name}",
    tag = "tools",
    params(("name" = String, Path, description = "Registered tool name")),
    responses(
        (status = 200, description = "Tool result"),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 404, description = "Unknown tool", body = ErrorResponse),
        (status = 409, description = "request_id already in flight", body = ErrorResponse)
    )
)]
pub async fn invoke_handler(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiFailure> {
    let Json(body) = body.map_err(rejected)?;
    run_tool(&state, &name, body).await
}

#[utoipa::path(
    get,
    path = "/resources",
    tag = "tools",
    responses((status = 200, description = "Readable resources", body = ResourceListResponse))
)]
pub async fn resources_handler(State(state): State<Arc<ServerState>>) -> Json<ResourceListResponse> {
    Json(ResourceListResponse {
        resources: state.gateway().resources(),
    })
}
