pub mod generate;
pub mod status;
pub mod tools;

use super::error::{ApiFailure, failure};
use super::state::ServerState;
use axum::Json;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

/// Invoke `tool` with the request body as params. The in-flight id is the
/// body's `request_id`, generated (and written back) when absent. A client
/// that disconnects cancels the invocation.
pub(super) async fn run_tool(
    state: &ServerState,
    tool: &str,
    mut body: Value,
) -> Result<Json<Value>, ApiFailure> {
    let request_id = match body.get("request_id").and_then(Value::as_str) {
        Some(id) => id.to_string(),
        None => {
            let id = Uuid::new_v4().to_string();
            if let Some(fields) = body.as_object_mut() {
                fields.insert("request_id".into(), Value::String(id.clone()));
            }
            id
        }
    };
    info!(request_id = request_id.as_str(), tool, "HTTP tool invocation");

    state
        .gateway()
        .call_detached(&request_id, tool, body)
        .await
        .map(Json)
        .map_err(failure)
}
