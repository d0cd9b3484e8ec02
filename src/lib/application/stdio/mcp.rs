use super::{Session, encode};
use crate::constants::{PROTOCOL_VERSION, SERVER_NAME};
use crate::domain::ServiceError;
use crate::infrastructure::rpc::{
    INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION, RpcRequest, RpcResponse,
};
use serde_json::{Value, json};
use tracing::debug;

pub(super) fn parse_error(error: &serde_json::Error) -> RpcResponse {
    RpcResponse::parse_error(format!("Parse error: {error}"))
}

/// In-flight key of an MCP request id; string ids are used verbatim.
fn request_key(id: &Value) -> String {
    match id {
        Value::String(id) => id.clone(),
        other => other.to_string(),
    }
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": { "listChanged": false },
            "resources": { "subscribe": false, "listChanged": false },
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}

/// Reply to `tools/call`. Cancelled calls stay silent; tool failures are
/// results flagged `isError` so the model can see them.
fn tool_call_reply(id: Option<Value>, result: Result<Value, ServiceError>) -> Option<RpcResponse> {
    match result {
        Ok(value) => Some(RpcResponse::success(
            id,
            json!({
                "content": [{ "type": "text", "text": value.to_string() }],
                "structuredContent": value,
                "isError": false,
            }),
        )),
        Err(ServiceError::Cancelled) => None,
        Err(error @ ServiceError::UnknownTool(_)) => Some(RpcResponse::error_with_detail(
            id,
            INVALID_PARAMS,
            error.detail(),
        )),
        Err(error) => Some(RpcResponse::success(
            id,
            json!({
                "content": [{ "type": "text", "text": error.user_message() }],
                "structuredContent": { "errorDetail": error.detail() },
                "isError": true,
            }),
        )),
    }
}

impl Session {
    pub(super) async fn handle_mcp(&mut self, value: Value) {
        let id_hint = value.get("id").cloned();
        let request: RpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(error) => {
                self.send(&RpcResponse::invalid_request(
                    id_hint,
                    format!("Invalid request: {error}"),
                ))
                .await;
                return;
            }
        };
        if request.jsonrpc != JSONRPC_VERSION {
            self.send(&RpcResponse::invalid_request(
                request.id,
                "Unsupported jsonrpc version (expected 2.0)",
            ))
            .await;
            return;
        }

        if request.is_notification() {
            self.handle_notification(&request);
            return;
        }
        debug!(method = request.method.as_str(), "MCP request received");
        if request.method == "tools/call" {
            self.call_tool(request).await;
            return;
        }

        let id = request.id.clone();
        let response = match request.method.as_str() {
            "initialize" => RpcResponse::success(id, initialize_result()),
            "ping" => RpcResponse::success(id, json!({})),
            "tools/list" => RpcResponse::success(id, json!({ "tools": self.gateway.discover() })),
            "resources/list" => {
                RpcResponse::success(id, json!({ "resources": self.gateway.resources() }))
            }
            "resources/read" => self.read_resource(id, request.params.as_ref()),
            method => RpcResponse::method_not_found(id, method),
        };
        self.send(&response).await;
    }

    fn handle_notification(&self, request: &RpcRequest) {
        match request.method.as_str() {
            "notifications/cancelled" => {
                let target = request
                    .params
                    .as_ref()
                    .and_then(|params| params.get("requestId"));
                if let Some(target) = target {
                    self.gateway.cancel(&request_key(target));
                }
            }
            method => debug!(method, "Notification ignored"),
        }
    }

    fn read_resource(&self, id: Option<Value>, params: Option<&Value>) -> RpcResponse {
        let Some(uri) = params.and_then(|p| p.get("uri")).and_then(Value::as_str) else {
            return RpcResponse::invalid_params(id, "params.uri is required");
        };
        match self.gateway.read_resource(uri) {
            Ok(contents) => {
                let text = serde_json::to_string_pretty(&contents).unwrap_or_default();
                RpcResponse::success(
                    id,
                    json!({
                        "contents": [{
                            "uri": uri,
                            "mimeType": "application/json",
                            "text": text,
                        }]
                    }),
                )
            }
            Err(error) => RpcResponse::error_with_detail(id, INVALID_PARAMS, error.detail()),
        }
    }

    async fn call_tool(&mut self, request: RpcRequest) {
        let id = request.id;
        let params = request.params.unwrap_or(Value::Null);
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            self.send(&RpcResponse::invalid_params(id, "params.name is required"))
                .await;
            return;
        };
        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| json!({}));
        let key = id.as_ref().map(request_key).unwrap_or_default();

        match self.gateway.admit(&key, &arguments, &self.cancel) {
            Ok(guard) => self.spawn_invocation(guard, name.to_string(), arguments, move |result| {
                tool_call_reply(id, result).and_then(|response| encode(&response))
            }),
            Err(error) => {
                self.send(&RpcResponse::error_with_detail(id, INVALID_REQUEST, error.detail()))
                    .await;
            }
        }
    }
}
