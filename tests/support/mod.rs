// Shared fixtures: wiremock backends for the workers and the blob store, and
// a gateway wired to them through the production configuration path.

#![allow(dead_code)]

use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use whisperwynd_mcp::Gateway;
use whisperwynd_mcp::config::{AppConfig, Credentials, parse_config};
use wiremock::matchers::{header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "test-token";
pub const CONTAINER: &str = "media";
/// base64 of `hello`
pub const HELLO_B64: &str = "aGVsbG8=";

pub struct Backends {
    pub worker: MockServer,
    pub renderer: MockServer,
    pub store: MockServer,
}

impl Backends {
    pub async fn start() -> Self {
        Self {
            worker: MockServer::start().await,
            renderer: MockServer::start().await,
            store: MockServer::start().await,
        }
    }

    pub fn credentials(&self) -> Credentials {
        let vars: HashMap<&str, String> = [
            ("WORKER_URL", self.worker.uri()),
            ("WORKER_TOKEN", TOKEN.to_string()),
            ("RENDERER_URL", self.renderer.uri()),
            (
                "STORAGE_CONNECTION_STRING",
                format!(
                    "BlobEndpoint={};SharedAccessSignature=sv=2022-11-02&sig=test",
                    self.store.uri()
                ),
            ),
            ("STORAGE_CONTAINER", CONTAINER.to_string()),
            ("BOT_CLIENT_ID", "bot-client".to_string()),
            ("BOT_CLIENT_SECRET", "bot-secret".to_string()),
        ]
        .into_iter()
        .collect();
        Credentials::from_lookup(|key| vars.get(key).cloned()).unwrap()
    }

    /// Fast polling, artifacts under `dir`.
    pub fn config(&self, dir: &Path, max_attempts: u32) -> AppConfig {
        let settings = format!(
            r#"
[storage]
local_dir = "{}"
public_prefix = "/generated_images"

[polling]
max_attempts = {max_attempts}
base_delay_ms = 10
max_delay_ms = 20

[[personas]]
name = "archivist"
description = "Keeps generated artifacts tidy"
"#,
            dir.display()
        );
        parse_config(&settings, self.credentials()).unwrap()
    }

    pub fn gateway(&self, dir: &Path, max_attempts: u32) -> Arc<Gateway> {
        Arc::new(Gateway::from_config(&self.config(dir, max_attempts)).unwrap())
    }

    pub fn blob_url(&self, name: &str) -> String {
        format!("{}/{CONTAINER}/{name}", self.store.uri())
    }

    /// Accept container creation and every blob upload.
    pub async fn accept_uploads(&self) {
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&self.store)
            .await;
    }

    pub async fn reject_uploads(&self) {
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(503).set_body_string("ServerBusy"))
            .mount(&self.store)
            .await;
    }
}

/// `/run` answers `job_id`; `/status/{job_id}` reports IN_PROGRESS
/// `pending_polls` times, then COMPLETED with `output`.
pub async fn script_job(server: &MockServer, job_id: &str, pending_polls: u64, output: Value) {
    Mock::given(method("POST"))
        .and(path("/run"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": job_id})))
        .mount(server)
        .await;
    if pending_polls > 0 {
        Mock::given(method("GET"))
            .and(path(format!("/status/{job_id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "IN_PROGRESS"})))
            .up_to_n_times(pending_polls)
            .with_priority(1)
            .mount(server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path(format!("/status/{job_id}")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "COMPLETED", "output": output})),
        )
        .mount(server)
        .await;
}

/// A job that never leaves the queue; its cancel endpoint accepts calls.
pub async fn stuck_job(server: &MockServer, job_id: &str) {
    Mock::given(method("POST"))
        .and(path("/run"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": job_id})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/status/{job_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "IN_QUEUE"})))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/cancel/.+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "CANCELLED"})))
        .mount(server)
        .await;
}

pub fn image_output() -> Value {
    json!({"image": format!("data:image/png;base64,{HELLO_B64}")})
}

pub fn pdf_output() -> Value {
    json!({"pdf_base64": HELLO_B64})
}

/// Requests received with `method_name` on a path starting with `prefix`.
pub async fn hits(server: &MockServer, method_name: &str, prefix: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| {
            request.method.as_str() == method_name && request.url.path().starts_with(prefix)
        })
        .count()
}
