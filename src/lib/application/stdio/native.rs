use super::{Session, encode};
use crate::domain::{Operation, RequestEnvelope, ResponseEnvelope, ServiceError};
use serde_json::{Value, json};
use tracing::debug;

pub(super) fn failure(request_id: Option<String>, message: &str) -> ResponseEnvelope {
    ResponseEnvelope::error(request_id, &ServiceError::protocol(message))
}

fn string_param<'a>(params: &'a Value, key: &str) -> Result<&'a str, ServiceError> {
    params
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ServiceError::validation(format!("params.{key} is required")))
}

impl Session {
    pub(super) async fn handle_native(&mut self, value: Value) {
        let request_id = value
            .get("requestId")
            .or_else(|| value.get("request_id"))
            .and_then(Value::as_str)
            .map(str::to_owned);

        let envelope: RequestEnvelope = match serde_json::from_value(value) {
            Ok(envelope) => envelope,
            Err(error) => {
                self.send(&failure(request_id, &format!("malformed envelope: {error}")))
                    .await;
                return;
            }
        };
        debug!(
            request_id = envelope.request_id.as_str(),
            op = ?envelope.op,
            "Native request received"
        );

        let reply = match envelope.op {
            Operation::Invoke => {
                self.invoke(envelope).await;
                return;
            }
            Operation::Discover => Ok(json!({ "tools": self.gateway.discover() })),
            Operation::Resources => Ok(json!({ "resources": self.gateway.resources() })),
            Operation::ReadResource => string_param(&envelope.params, "uri")
                .and_then(|uri| self.gateway.read_resource(uri)),
            Operation::Cancel => string_param(&envelope.params, "target").map(|target| {
                json!({
                    "target": target,
                    "cancelled": self.gateway.cancel(target),
                })
            }),
        };
        self.send(&ResponseEnvelope::from_result(envelope.request_id, reply))
            .await;
    }

    async fn invoke(&mut self, envelope: RequestEnvelope) {
        let RequestEnvelope {
            request_id,
            tool_name,
            params,
            ..
        } = envelope;
        let Some(tool) = tool_name.filter(|name| !name.is_empty()) else {
            self.send(&failure(Some(request_id), "toolName is required for invoke"))
                .await;
            return;
        };

        match self.gateway.admit(&request_id, &params, &self.cancel) {
            Ok(guard) => self.spawn_invocation(guard, tool, params, move |result| {
                encode(&ResponseEnvelope::from_result(request_id, result))
            }),
            Err(error) => {
                self.send(&ResponseEnvelope::error(Some(request_id), &error))
                    .await;
            }
        }
    }
}
