//! Entry point shared by the stdio protocol server and the HTTP bridge

use super::artifacts::ArtifactStore;
use super::dispatcher::JobDispatcher;
use super::inflight::{InFlightGuard, InFlightRequests};
use super::metrics::{MetricsCollector, MetricsSnapshot};
use super::normalizer::ResultNormalizer;
use super::pipeline::GenerationPipeline;
use super::poller::PollPolicy;
use super::tooling::{HealthReport, ResourceDescriptor, ToolDescriptor, ToolRegistry};
use crate::config::{AppConfig, PersonaDescriptor};
use crate::domain::ServiceError;
use crate::infrastructure::storage::{AzureBlobStore, RemoteStore, StorageError};
use crate::infrastructure::worker::{GenerationWorker, HttpWorker, WorkerError};
use secrecy::ExposeSecret;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub const IMAGE_WORKER_ID: &str = "image-worker";
pub const DOCUMENT_WORKER_ID: &str = "document-renderer";

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to build worker client: {0}")]
    Worker(#[from] WorkerError),
    #[error("failed to configure remote storage: {0}")]
    Storage(#[from] StorageError),
    #[error("failed to build result fetch client: {0}")]
    Http(#[from] reqwest::Error),
}

pub struct Gateway {
    registry: ToolRegistry,
    inflight: Arc<InFlightRequests>,
    personas: Vec<PersonaDescriptor>,
    artifact_dir: PathBuf,
    public_prefix: String,
}

impl Gateway {
    pub fn new(
        registry: ToolRegistry,
        personas: Vec<PersonaDescriptor>,
        artifact_dir: impl Into<PathBuf>,
        public_prefix: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            inflight: InFlightRequests::new(),
            personas,
            artifact_dir: artifact_dir.into(),
            public_prefix: public_prefix.into(),
        }
    }

    /// Wire HTTP workers and the blob store from an immutable configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, BootstrapError> {
        let credentials = &config.credentials;
        let timeout = config.worker.request_timeout();
        let image: Arc<dyn GenerationWorker> = Arc::new(HttpWorker::new(
            IMAGE_WORKER_ID,
            credentials.worker.url.as_str(),
            credentials.worker.token(),
            timeout,
        )?);
        let document: Arc<dyn GenerationWorker> = Arc::new(HttpWorker::new(
            DOCUMENT_WORKER_ID,
            credentials.renderer.url.as_str(),
            credentials.renderer.token(),
            timeout,
        )?);
        let remote: Arc<dyn RemoteStore> = Arc::new(AzureBlobStore::from_connection_string(
            credentials.storage_connection_string.expose_secret(),
            credentials.storage_container.clone(),
            timeout,
        )?);
        info!(store = %remote.location(), "Remote artifact store configured");

        Ok(Self::assemble(config, image, document, remote)?)
    }

    /// Wire the given workers and store with the settings of `config`.
    pub fn assemble(
        config: &AppConfig,
        image: Arc<dyn GenerationWorker>,
        document: Arc<dyn GenerationWorker>,
        remote: Arc<dyn RemoteStore>,
    ) -> Result<Self, reqwest::Error> {
        let pipeline = GenerationPipeline::new(
            JobDispatcher::new(image, document),
            ResultNormalizer::new(config.worker.fetch_timeout(), config.worker.max_result_bytes)?,
            ArtifactStore::from_settings(&config.storage, remote),
            PollPolicy::from(&config.polling),
        );
        let metrics = Arc::new(MetricsCollector::new(config.metrics.window_capacity));
        let registry = ToolRegistry::new(Arc::new(pipeline), metrics);
        Ok(Self::new(
            registry,
            config.personas.clone(),
            config.storage.local_dir.clone(),
            config.storage.public_prefix.clone(),
        ))
    }

    pub fn discover(&self) -> &[ToolDescriptor] {
        self.registry.discover()
    }

    pub fn resources(&self) -> Vec<ResourceDescriptor> {
        self.registry.resources()
    }

    pub fn read_resource(&self, uri: &str) -> Result<Value, ServiceError> {
        self.registry.read_resource(uri)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.registry.metrics().snapshot()
    }

    pub fn health(&self) -> HealthReport {
        self.registry.health()
    }

    pub fn personas(&self) -> &[PersonaDescriptor] {
        &self.personas
    }

    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    pub fn public_prefix(&self) -> &str {
        &self.public_prefix
    }

    pub fn in_flight(&self) -> &Arc<InFlightRequests> {
        &self.inflight
    }

    /// Claim `request_id` for an invocation, together with the artifact name
    /// in `params.request_id`, so two live invocations never write the same
    /// file. The token is a child of `session`.
    pub fn admit(
        &self,
        request_id: &str,
        params: &Value,
        session: &CancellationToken,
    ) -> Result<InFlightGuard, ServiceError> {
        let artifact = params.get("request_id").and_then(Value::as_str);
        self.inflight.admit(request_id, artifact, session)
    }

    pub async fn invoke(
        &self,
        guard: &InFlightGuard,
        tool: &str,
        params: Value,
    ) -> Result<Value, ServiceError> {
        self.registry.dispatch(tool, params, guard.token()).await
    }

    /// Admit, run and release in one call. Dropping the future cancels the work.
    pub async fn call(
        &self,
        request_id: &str,
        tool: &str,
        params: Value,
    ) -> Result<Value, ServiceError> {
        let guard = self.admit(request_id, &params, &CancellationToken::new())?;
        self.invoke(&guard, tool, params).await
    }

    /// Like [`Gateway::call`], but the invocation runs on its own task.
    /// Dropping the returned future cancels the token, and the task then
    /// unwinds through the regular cancellation path, including the
    /// worker-side cancel.
    pub async fn call_detached(
        self: &Arc<Self>,
        request_id: &str,
        tool: &str,
        params: Value,
    ) -> Result<Value, ServiceError> {
        let guard = self.admit(request_id, &params, &CancellationToken::new())?;
        let _cancel_on_drop = guard.token().clone().drop_guard();
        let gateway = Arc::clone(self);
        let tool = tool.to_string();
        let task = tokio::spawn(async move { gateway.invoke(&guard, &tool, params).await });
        match task.await {
            Ok(result) => result,
            Err(error) => Err(ServiceError::external(
                None,
                format!("invocation task failed: {error}"),
            )),
        }
    }

    pub fn cancel(&self, request_id: &str) -> bool {
        let found = self.inflight.cancel(request_id);
        info!(request_id, found, "Cancellation requested");
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{self, MemoryStore, ScriptedWorker};
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::sleep;

    fn stuck_gateway(dir: &Path) -> (Arc<Gateway>, Arc<ScriptedWorker>) {
        let image = Arc::new(ScriptedWorker::new("image"));
        let gateway = test_support::gateway(
            image.clone(),
            Arc::new(ScriptedWorker::new("renderer")),
            MemoryStore::new(),
            dir,
            1_000,
        );
        (Arc::new(gateway), image)
    }

    async fn until_submitted(worker: &ScriptedWorker) {
        while worker.submissions() == 0 {
            sleep(Duration::from_millis(1)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_a_detached_call_cancels_the_job() {
        let dir = tempfile::tempdir().unwrap();
        let (gateway, image) = stuck_gateway(dir.path());

        let call = gateway.call_detached("r1", "generate_image", json!({"request_id": "r1", "prompt": "x"}));
        tokio::select! {
            _ = call => panic!("stuck job must not finish"),
            _ = until_submitted(&image) => {}
        }

        while gateway.in_flight().contains("r1") {
            sleep(Duration::from_millis(1)).await;
        }
        assert_eq!(image.cancels(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn second_call_with_same_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (gateway, image) = stuck_gateway(dir.path());
        let params = json!({"request_id": "dup", "prompt": "x"});

        let first = gateway.call("dup", "generate_image", params.clone());
        let second = async {
            until_submitted(&image).await;
            let rejected = gateway.call("dup", "generate_image", params.clone()).await;
            assert!(matches!(rejected, Err(ServiceError::DuplicateRequest(_))));
            assert!(gateway.cancel("dup"));
        };
        let (first, ()) = tokio::join!(first, second);

        assert!(matches!(first, Err(ServiceError::Cancelled)));
        assert!(!gateway.in_flight().contains("dup"));
        assert_eq!(image.submissions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_ids_sharing_an_artifact_name_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (gateway, image) = stuck_gateway(dir.path());
        let params = json!({"request_id": "shared", "prompt": "x"});

        let first = gateway.call("a", "generate_image", params.clone());
        let second = async {
            until_submitted(&image).await;
            let rejected = gateway.call("b", "generate_image", params.clone()).await;
            assert!(matches!(rejected, Err(ServiceError::DuplicateRequest(ref key)) if key == "shared"));
            assert!(gateway.cancel("a"));
        };
        let (first, ()) = tokio::join!(first, second);

        assert!(matches!(first, Err(ServiceError::Cancelled)));
        assert!(gateway.in_flight().is_empty());
        assert_eq!(image.submissions(), 1);
    }

    #[test]
    fn cancelling_an_unknown_id_reports_false() {
        let dir = tempfile::tempdir().unwrap();
        let (gateway, _) = stuck_gateway(dir.path());
        assert!(!gateway.cancel("nobody"));
    }
}
