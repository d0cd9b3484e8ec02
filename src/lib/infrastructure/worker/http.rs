//! HTTP worker client speaking the `/run`, `/status/{id}`, `/cancel/{id}` contract

use super::traits::GenerationWorker;
use super::types::{SubmitResponse, WorkerError, WorkerRequest, WorkerStatus};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

const ERROR_BODY_LIMIT: usize = 512;

pub struct HttpWorker {
    id: String,
    endpoint: String,
    token: SecretString,
    http: Client,
}

impl HttpWorker {
    pub fn new(
        id: impl Into<String>,
        endpoint: impl Into<String>,
        token: SecretString,
        timeout: Duration,
    ) -> Result<Self, WorkerError> {
        let id = id.into();
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WorkerError::network(&id, e))?;
        Ok(Self {
            id,
            endpoint: endpoint.into(),
            token,
            http,
        })
    }

    /// Build URL from endpoint and path
    pub fn build_url(&self, path: &str) -> String {
        let base = self.endpoint.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header(
            "Authorization",
            format!("Bearer {}", self.token.expose_secret()),
        )
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, WorkerError> {
        let response = self
            .authorized(builder)
            .send()
            .await
            .map_err(|e| WorkerError::network(&self.id, e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(WorkerError::Unauthorized {
                worker: self.id.clone(),
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > ERROR_BODY_LIMIT {
                let cut = (0..=ERROR_BODY_LIMIT)
                    .rev()
                    .find(|i| body.is_char_boundary(*i))
                    .unwrap_or(0);
                body.truncate(cut);
            }
            return Err(WorkerError::Status {
                worker: self.id.clone(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(&self, response: Response) -> Result<T, WorkerError> {
        response
            .json()
            .await
            .map_err(|e| WorkerError::invalid_response(&self.id, e.to_string()))
    }
}

#[async_trait]
impl GenerationWorker for HttpWorker {
    fn id(&self) -> &str {
        &self.id
    }

    async fn submit(&self, request: &WorkerRequest) -> Result<String, WorkerError> {
        let url = self.build_url("run");
        debug!(worker = %self.id, %url, kind = %request.kind, "Submitting job");
        let body = json!({ "input": request.input });
        let response = self.send(self.http.post(&url).json(&body)).await?;
        let submitted: SubmitResponse = self.decode(response).await?;
        submitted
            .id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| WorkerError::invalid_response(&self.id, "job id missing from /run response"))
    }

    async fn status(&self, external_id: &str) -> Result<WorkerStatus, WorkerError> {
        let url = self.build_url(&format!("status/{external_id}"));
        let response = self.send(self.http.get(&url)).await?;
        self.decode(response).await
    }

    async fn cancel(&self, external_id: &str) -> Result<(), WorkerError> {
        let url = self.build_url(&format!("cancel/{external_id}"));
        match self.send(self.http.post(&url)).await {
            Ok(_) => Ok(()),
            Err(error) => {
                warn!(worker = %self.id, job = external_id, %error, "Worker cancel request failed");
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::JobKind;
    use crate::infrastructure::worker::RemoteState;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn worker(server: &MockServer) -> HttpWorker {
        HttpWorker::new(
            "image",
            server.uri(),
            SecretString::from("sekret".to_string()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn request() -> WorkerRequest {
        WorkerRequest {
            kind: JobKind::Image,
            input: json!({"prompt": "a fox", "width": 512, "height": 512}),
        }
    }

    #[test]
    fn build_url_joins_without_double_slashes() {
        let worker = HttpWorker::new(
            "image",
            "https://api.example.test/v2/flux/",
            SecretString::from("t".to_string()),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            worker.build_url("/status/abc"),
            "https://api.example.test/v2/flux/status/abc"
        );
    }

    #[tokio::test]
    async fn submit_sends_bearer_and_input_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/run"))
            .and(header("Authorization", "Bearer sekret"))
            .and(body_json(json!({"input": {"prompt": "a fox", "width": 512, "height": 512}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "job-7", "status": "IN_QUEUE"})))
            .expect(1)
            .mount(&server)
            .await;

        let id = worker(&server).submit(&request()).await.unwrap();
        assert_eq!(id, "job-7");
    }

    #[tokio::test]
    async fn submit_without_id_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/run"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "IN_QUEUE"})))
            .mount(&server)
            .await;

        let err = worker(&server).submit(&request()).await.unwrap_err();
        assert!(matches!(err, WorkerError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn unauthorized_and_server_errors_are_distinguished() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status/denied"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/status/broken"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let worker = worker(&server);
        assert!(matches!(
            worker.status("denied").await.unwrap_err(),
            WorkerError::Unauthorized { status: 401, .. }
        ));
        match worker.status("broken").await.unwrap_err() {
            WorkerError::Status { status, body, .. } => {
                assert_eq!(status, 503);
                assert_eq!(body, "overloaded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn status_decodes_output() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status/job-7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "job-7",
                "status": "COMPLETED",
                "output": {"image_url": "https://cdn.example.test/x.png"}
            })))
            .mount(&server)
            .await;

        let status = worker(&server).status("job-7").await.unwrap();
        assert_eq!(status.status, RemoteState::Completed);
        assert_eq!(
            status.output.unwrap()["image_url"],
            "https://cdn.example.test/x.png"
        );
    }
}
