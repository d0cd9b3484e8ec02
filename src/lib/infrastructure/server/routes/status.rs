use super::super::dto::PersonaListResponse;
use super::super::state::ServerState;
use crate::application::metrics::MetricsSnapshot;
use crate::application::tooling::HealthReport;
use axum::Json;
use axum::extract::State;
use std::sync::Arc;
use tracing::debug;

#[utoipa::path(
    get,
    path = "/health",
    tag = "status",
    responses((status = 200, description = "Readiness and uptime", body = HealthReport))
)]
pub async fn health_handler(State(state): State<Arc<ServerState>>) -> Json<HealthReport> {
    Json(state.gateway().health())
}

#[utoipa::path(
    get,
    path = "/stats",
    tag = "status",
    responses((status = 200, description = "Recent invocation metrics", body = MetricsSnapshot))
)]
pub async fn stats_handler(State(state): State<Arc<ServerState>>) -> Json<MetricsSnapshot> {
    let snapshot = state.gateway().metrics();
    debug!(count = snapshot.count, "Serving /stats request");
    Json(snapshot)
}

#[utoipa::path(
    get,
    path = "/personas",
    tag = "status",
    responses((status = 200, description = "Configured personas", body = PersonaListResponse))
)]
pub async fn personas_handler(State(state): State<Arc<ServerState>>) -> Json<PersonaListResponse> {
    Json(PersonaListResponse {
        personas: state.gateway().personas().to_vec(),
    })
}
