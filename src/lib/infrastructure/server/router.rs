use super::docs::ApiDoc;
use super::error::ServerError;
use super::routes;
use super::state::ServerState;
use crate::application::Gateway;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{info, warn};
use utoipa::OpenApi;

/// The bridge's full route table. Artifacts are served from the gateway's
/// local directory under its public prefix.
pub fn build_router(gateway: Arc<Gateway>, cors_origins: &[String]) -> Router {
    let artifacts = ServeDir::new(gateway.artifact_dir());
    let prefix = gateway.public_prefix().trim_end_matches('/').to_string();
    let state = Arc::new(ServerState::new(gateway));

    let router = Router::new()
        .route("/health", get(routes::status::health_handler))
        .route("/stats", get(routes::status::stats_handler))
        .route("/personas", get(routes::status::personas_handler))
        .route("/generate", post(routes::generate::generate_handler))
        .route(
            "/convert_html_to_pdf",
            post(routes::generate::convert_handler),
        )
        .route("/tools", get(routes::tools::tools_handler))
        .route("/tools/{name}", post(routes::tools::invoke_handler))
        .route("/resources", get(routes::tools::resources_handler))
        .route("/api-doc/openapi.json", get(openapi_handler));

    let router = if prefix.is_empty() {
        router.fallback_service(artifacts)
    } else {
        router.nest_service(&prefix, artifacts)
    };

    router.layer(cors_layer(cors_origins)).with_state(state)
}

pub(super) async fn serve(
    gateway: Arc<Gateway>,
    addr: SocketAddr,
    cors_origins: &[String],
) -> Result<(), ServerError> {
    let app = build_router(gateway, cors_origins);
    info!(%addr, "Binding REST server");

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    info!(%addr, "REST server ready to accept connections");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "Cannot listen for Ctrl-C; serving until aborted");
        std::future::pending::<()>().await;
    }
    info!("REST server shutting down");
}

async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);
    if origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = origin.as_str(), "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}
