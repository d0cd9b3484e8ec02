//! In-process fakes for the worker and blob store seams

use super::artifacts::ArtifactStore;
use super::dispatcher::JobDispatcher;
use super::gateway::Gateway;
use super::metrics::MetricsCollector;
use super::normalizer::ResultNormalizer;
use super::pipeline::GenerationPipeline;
use super::poller::PollPolicy;
use super::tooling::ToolRegistry;
use crate::config::PersonaDescriptor;
use crate::infrastructure::storage::{RemoteStore, StorageError};
use crate::infrastructure::worker::{
    GenerationWorker, RemoteState, WorkerError, WorkerRequest, WorkerStatus,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use std::sync::atomic::{AtomicUsize, Ordering};

pub(crate) struct ScriptedWorker {
    id: String,
    script: Mutex<VecDeque<WorkerStatus>>,
    reject_submit_with: Option<u16>,
    submissions: AtomicUsize,
    polls: AtomicUsize,
    cancels: AtomicUsize,
    last_input: Mutex<Option<Value>>,
}

impl ScriptedWorker {
    /// A worker whose jobs stay `IN_PROGRESS` forever.
    pub(crate) fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            script: Mutex::new(VecDeque::new()),
            reject_submit_with: None,
            submissions: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
            cancels: AtomicUsize::new(0),
            last_input: Mutex::new(None),
        }
    }

    /// Statuses returned by successive polls; afterwards `IN_PROGRESS`.
    pub(crate) fn with_script(id: &str, statuses: Vec<WorkerStatus>) -> Self {
        let worker = Self::new(id);
        *worker.script.lock().unwrap() = statuses.into();
        worker
    }

    /// Completes on poll `attempt` with `output`.
    pub(crate) fn completing_on(id: &str, attempt: usize, output: Value) -> Self {
        let mut statuses = vec![WorkerStatus::new(RemoteState::InProgress); attempt - 1];
        statuses.push(WorkerStatus::completed(output));
        Self::with_script(id, statuses)
    }

    pub(crate) fn rejecting_submit(id: &str, status: u16) -> Self {
        Self {
            reject_submit_with: Some(status),
            ..Self::new(id)
        }
    }

    pub(crate) fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    pub(crate) fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub(crate) fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    pub(crate) fn last_input(&self) -> Option<Value> {
        self.last_input.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationWorker for ScriptedWorker {
    fn id(&self) -> &str {
        &self.id
    }

    async fn submit(&self, request: &WorkerRequest) -> Result<String, WorkerError> {
        if let Some(status) = self.reject_submit_with {
            return Err(WorkerError::Status {
                worker: self.id.clone(),
                status,
                body: "unavailable".into(),
            });
        }
        let n = self.submissions.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_input.lock().unwrap() = Some(request.input.clone());
        Ok(format!("{}-job-{n}", self.id))
    }

    async fn status(&self, _external_id: &str) -> Result<WorkerStatus, WorkerError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| WorkerStatus::new(RemoteState::InProgress)))
    }

    async fn cancel(&self, _external_id: &str) -> Result<(), WorkerError> {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub(crate) const STORE_BASE: &str = "https://store.test/images";

pub(crate) struct MemoryStore {
    fail: bool,
    puts: Mutex<Vec<(String, usize)>>,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self {
            fail: false,
            puts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.puts
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    fn location(&self) -> String {
        STORE_BASE.to_string()
    }

    async fn put(
        &self,
        name: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<String, StorageError> {
        if self.fail {
            return Err(StorageError::Status {
                status: 503,
                body: "ServerBusy".into(),
            });
        }
        self.puts
            .lock()
            .unwrap()
            .push((name.to_string(), bytes.len()));
        Ok(format!("{STORE_BASE}/{name}"))
    }
}

pub(crate) const PUBLIC_PREFIX: &str = "/generated_images";

/// A gateway over fakes, writing artifacts to `dir`. Polls every 10-40 ms for
/// up to `max_attempts` attempts.
pub(crate) fn gateway(
    image: Arc<ScriptedWorker>,
    document: Arc<ScriptedWorker>,
    remote: MemoryStore,
    dir: &Path,
    max_attempts: u32,
) -> Gateway {
    let pipeline = GenerationPipeline::new(
        JobDispatcher::new(image, document),
        ResultNormalizer::new(Duration::from_secs(5), 1 << 20).unwrap(),
        ArtifactStore::new(dir, PUBLIC_PREFIX, Arc::new(remote)),
        PollPolicy::new(max_attempts, Duration::from_millis(10), Duration::from_millis(40)),
    );
    let registry = ToolRegistry::new(Arc::new(pipeline), Arc::new(MetricsCollector::new(10)));
    let personas = vec![PersonaDescriptor {
        name: "archivist".into(),
        description: "Keeps generated artifacts tidy".into(),
        tags: Vec::new(),
    }];
    Gateway::new(registry, personas, dir, PUBLIC_PREFIX)
}
