use super::*;
use crate::application::test_support::{self, MemoryStore, ScriptedWorker};
use crate::infrastructure::worker::{RemoteState, WorkerStatus};
use serde_json::json;
use std::time::Duration;
use tokio::io::{DuplexStream, Lines};
use tokio::task::JoinHandle;

struct Harness {
    input: Option<DuplexStream>,
    output: Lines<BufReader<DuplexStream>>,
    server: JoinHandle<Result<(), StdioError>>,
    image: Arc<ScriptedWorker>,
    _dir: tempfile::TempDir,
}

impl Harness {
    fn start(image: ScriptedWorker) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let image = Arc::new(image);
        let gateway = test_support::gateway(
            image.clone(),
            Arc::new(ScriptedWorker::new("renderer")),
            MemoryStore::new(),
            dir.path(),
            1_000,
        );

        let (input, server_in) = tokio::io::duplex(64 * 1024);
        let (server_out, output) = tokio::io::duplex(64 * 1024);
        let server = tokio::spawn(serve(
            Arc::new(gateway),
            BufReader::new(server_in),
            server_out,
        ));
        Self {
            input: Some(input),
            output: BufReader::new(output).lines(),
            server,
            image,
            _dir: dir,
        }
    }

    fn idle() -> Self {
        Self::start(ScriptedWorker::new("image"))
    }

    /// Write all `lines` in a single chunk so the server reads them back to back.
    async fn send(&mut self, lines: &[Value]) {
        let mut chunk = String::new();
        for line in lines {
            chunk.push_str(&line.to_string());
            chunk.push('\n');
        }
        self.send_raw(&chunk).await;
    }

    async fn send_raw(&mut self, chunk: &str) {
        let input = self.input.as_mut().unwrap();
        input.write_all(chunk.as_bytes()).await.unwrap();
    }

    async fn submitted(&self) {
        while self.image.submissions() == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    async fn recv(&mut self) -> Value {
        let line = self.output.next_line().await.unwrap().unwrap();
        serde_json::from_str(&line).unwrap()
    }

    async fn close(mut self) -> (Arc<ScriptedWorker>, Vec<Value>) {
        drop(self.input.take());
        self.server.await.unwrap().unwrap();
        let mut rest = Vec::new();
        while let Some(line) = self.output.next_line().await.unwrap() {
            rest.push(serde_json::from_str(&line).unwrap());
        }
        (self.image, rest)
    }
}

fn invoke(request_id: &str, tool: &str, params: Value) -> Value {
    json!({"op": "invoke", "requestId": request_id, "toolName": tool, "params": params})
}

#[tokio::test]
async fn discover_is_identical_across_calls() {
    let mut h = Harness::idle();
    h.send(&[
        json!({"op": "discover", "requestId": "d1"}),
        json!({"op": "discover", "requestId": "d2"}),
    ])
    .await;
    let first = h.recv().await;
    let second = h.recv().await;
    assert_eq!(first["requestId"], "d1");
    assert_eq!(first["status"], "ok");
    assert_eq!(first["payload"], second["payload"]);
    assert_eq!(first["payload"]["tools"].as_array().unwrap().len(), 5);
    h.close().await;
}

#[tokio::test]
async fn malformed_line_is_answered_and_the_session_continues() {
    let mut h = Harness::idle();
    h.send_raw("{not json\n").await;
    let reply = h.recv().await;
    assert_eq!(reply["status"], "error");
    assert!(reply["requestId"].is_null());
    assert_eq!(reply["errorDetail"]["kind"], "ProtocolError");

    h.send(&[json!({"op": "resources", "requestId": "after"})]).await;
    let reply = h.recv().await;
    assert_eq!(reply["requestId"], "after");
    assert_eq!(reply["payload"]["resources"].as_array().unwrap().len(), 3);
    h.close().await;
}

#[tokio::test]
async fn invoke_without_tool_name_is_a_protocol_error() {
    let mut h = Harness::idle();
    h.send(&[json!({"op": "invoke", "requestId": "r0", "params": {}})])
        .await;
    let reply = h.recv().await;
    assert_eq!(reply["requestId"], "r0");
    assert_eq!(reply["errorDetail"]["kind"], "ProtocolError");
    h.close().await;
}

#[tokio::test]
async fn unknown_envelope_op_echoes_request_id() {
    let mut h = Harness::idle();
    h.send(&[json!({"op": "teleport", "requestId": "x1"})]).await;
    let reply = h.recv().await;
    assert_eq!(reply["requestId"], "x1");
    assert_eq!(reply["errorDetail"]["kind"], "ProtocolError");
    h.close().await;
}

#[tokio::test(start_paused = true)]
async fn duplicate_request_id_is_rejected_while_first_runs() {
    let mut h = Harness::start(ScriptedWorker::completing_on(
        "image",
        3,
        json!({"image": "data:image/png;base64,aGVsbG8="}),
    ));
    let params = json!({"prompt": "a lighthouse", "request_id": "r1"});
    h.send(&[
        invoke("r1", "generate_image", params.clone()),
        invoke("r1", "generate_image", params),
    ])
    .await;

    let rejected = h.recv().await;
    assert_eq!(rejected["requestId"], "r1");
    assert_eq!(rejected["status"], "error");
    assert_eq!(rejected["errorDetail"]["kind"], "ProtocolError");

    let done = h.recv().await;
    assert_eq!(done["requestId"], "r1");
    assert_eq!(done["status"], "ok");
    assert_eq!(done["payload"]["image_url"], "/generated_images/r1.png");

    let (image, _) = h.close().await;
    assert_eq!(image.submissions(), 1);
}

#[tokio::test(start_paused = true)]
async fn shared_artifact_name_is_rejected_while_first_runs() {
    let mut h = Harness::idle();
    let params = json!({"prompt": "a lighthouse", "request_id": "shared"});
    h.send(&[invoke("a", "generate_image", params.clone())]).await;
    h.submitted().await;
    h.send(&[invoke("b", "generate_image", params)]).await;

    let rejected = h.recv().await;
    assert_eq!(rejected["requestId"], "b");
    assert_eq!(rejected["errorDetail"]["kind"], "ProtocolError");

    let (image, rest) = h.close().await;
    assert_eq!(image.submissions(), 1);
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0]["requestId"], "a");
}

#[tokio::test(start_paused = true)]
async fn cancel_op_stops_a_running_invocation() {
    let mut h = Harness::idle();
    h.send(&[invoke("r9", "generate_image", json!({"prompt": "slow", "request_id": "r9"}))])
        .await;
    h.submitted().await;
    h.send(&[json!({"op": "cancel", "requestId": "c1", "params": {"target": "r9"}})])
        .await;

    let mut replies = vec![h.recv().await, h.recv().await];
    replies.sort_by_key(|reply| reply["requestId"].as_str().unwrap().to_string());
    assert_eq!(replies[0]["requestId"], "c1");
    assert_eq!(replies[0]["payload"]["cancelled"], true);
    assert_eq!(replies[1]["requestId"], "r9");
    assert_eq!(replies[1]["errorDetail"]["kind"], "CancelledError");

    let (image, _) = h.close().await;
    assert_eq!(image.cancels(), 1);
}

#[tokio::test(start_paused = true)]
async fn end_of_input_cancels_in_flight_work() {
    let mut h = Harness::idle();
    h.send(&[invoke("r10", "generate_image", json!({"prompt": "never", "request_id": "r10"}))])
        .await;
    h.submitted().await;

    let (image, rest) = h.close().await;
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0]["requestId"], "r10");
    assert_eq!(rest[0]["errorDetail"]["kind"], "CancelledError");
    assert_eq!(image.cancels(), 1);
}

#[tokio::test(start_paused = true)]
async fn job_cancelled_by_the_worker_is_still_answered() {
    let cancelled = WorkerStatus::new(RemoteState::Cancelled);
    let mut h = Harness::start(ScriptedWorker::with_script(
        "image",
        vec![cancelled.clone(), cancelled],
    ));
    h.send(&[
        json!({"jsonrpc": "2.0", "id": "c1", "method": "tools/call",
               "params": {"name": "generate_image",
                          "arguments": {"prompt": "a kite", "request_id": "k1"}}}),
        invoke("n1", "generate_image", json!({"prompt": "a kite", "request_id": "k2"})),
    ])
    .await;

    let mut replies = vec![h.recv().await, h.recv().await];
    replies.sort_by_key(|reply| reply.get("id").is_some());

    let native = &replies[0];
    assert_eq!(native["requestId"], "n1");
    assert_eq!(native["errorDetail"]["kind"], "ExternalServiceError");

    let mcp = &replies[1];
    assert_eq!(mcp["id"], "c1");
    assert_eq!(mcp["result"]["isError"], true);
    assert_eq!(
        mcp["result"]["structuredContent"]["errorDetail"]["kind"],
        "ExternalServiceError"
    );

    let (image, _) = h.close().await;
    assert_eq!(image.cancels(), 0);
}

#[tokio::test]
async fn mcp_handshake_and_listing() {
    let mut h = Harness::idle();
    h.send(&[
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {"protocolVersion": "2025-06-18"}}),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
        json!({"jsonrpc": "2.0", "id": 3, "method": "resources/read", "params": {"uri": "whisperwynd://health"}}),
    ])
    .await;

    let init = h.recv().await;
    assert_eq!(init["id"], 1);
    assert_eq!(init["result"]["serverInfo"]["name"], "whisperwynd-mcp");
    assert!(init["result"]["capabilities"]["tools"].is_object());

    let list = h.recv().await;
    assert_eq!(list["id"], 2);
    assert_eq!(list["result"]["tools"][0]["name"], "generate_image");
    assert!(list["result"]["tools"][0]["inputSchema"].is_object());

    let health = h.recv().await;
    assert_eq!(health["id"], 3);
    let text = health["result"]["contents"][0]["text"].as_str().unwrap();
    let report: Value = serde_json::from_str(text).unwrap();
    assert_eq!(report["ready"], true);
    h.close().await;
}

#[tokio::test]
async fn mcp_tool_call_outcomes() {
    let mut h = Harness::idle();
    h.send(&[
        json!({"jsonrpc": "2.0", "id": "v", "method": "tools/call",
               "params": {"name": "validate_request", "arguments": {"request_data": {"prompt": "ok"}}}}),
        json!({"jsonrpc": "2.0", "id": "u", "method": "tools/call",
               "params": {"name": "launch_rocket", "arguments": {}}}),
        json!({"jsonrpc": "2.0", "id": "m", "method": "sampling/createMessage"}),
    ])
    .await;

    let mut replies = Vec::new();
    for _ in 0..3 {
        replies.push(h.recv().await);
    }
    let by_id = |id: &str| {
        replies
            .iter()
            .find(|reply| reply["id"] == id)
            .cloned()
            .unwrap()
    };

    let valid = by_id("v");
    assert_eq!(valid["result"]["isError"], false);
    assert_eq!(valid["result"]["structuredContent"]["is_valid"], true);

    let unknown = by_id("u");
    assert_eq!(unknown["error"]["code"], -32602);
    assert_eq!(unknown["error"]["data"]["kind"], "ProtocolError");

    let missing = by_id("m");
    assert_eq!(missing["error"]["code"], -32601);
    h.close().await;
}

#[tokio::test]
async fn null_id_request_is_answered() {
    let mut h = Harness::idle();
    h.send(&[
        json!({"jsonrpc": "2.0", "id": null, "method": "ping"}),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        json!({"jsonrpc": "2.0", "id": 5, "method": "ping"}),
    ])
    .await;

    let first = h.recv().await;
    assert!(first["id"].is_null());
    assert_eq!(first["result"], json!({}));
    let second = h.recv().await;
    assert_eq!(second["id"], 5);
    h.close().await;
}

#[tokio::test]
async fn broken_jsonrpc_line_gets_parse_error() {
    let mut h = Harness::idle();
    h.send_raw("{\"jsonrpc\": \"2.0\", \"id\": \n").await;
    let reply = h.recv().await;
    assert_eq!(reply["error"]["code"], -32700);
    assert!(reply["id"].is_null());
    h.close().await;
}
