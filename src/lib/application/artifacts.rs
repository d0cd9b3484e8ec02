//! Artifact Store: local write first, then a best-effort remote copy

use crate::config::StorageSettings;
use crate::domain::{Artifact, JobKind, ServiceError};
use crate::infrastructure::storage::{RemoteStore, StorageError};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct ArtifactStore {
    local_dir: PathBuf,
    public_prefix: String,
    remote: Arc<dyn RemoteStore>,
}

impl ArtifactStore {
    pub fn new(
        local_dir: impl Into<PathBuf>,
        public_prefix: impl Into<String>,
        remote: Arc<dyn RemoteStore>,
    ) -> Self {
        Self {
            local_dir: local_dir.into(),
            public_prefix: public_prefix.into(),
            remote,
        }
    }

    pub fn from_settings(settings: &StorageSettings, remote: Arc<dyn RemoteStore>) -> Self {
        Self::new(
            settings.local_dir.clone(),
            settings.public_prefix.clone(),
            remote,
        )
    }

    pub fn local_dir(&self) -> &Path {
        &self.local_dir
    }

    /// Store `buffer` as `{request_id}.{ext}`.
    ///
    /// A failed local write fails the call and skips the remote write. A failed
    /// remote write still returns the artifact, flagged `remote_pending`.
    /// Persisting the same `request_id` again overwrites the local file.
    pub async fn persist(
        &self,
        buffer: &[u8],
        kind: JobKind,
        request_id: &str,
    ) -> Result<Artifact, ServiceError> {
        let file_name = format!("{request_id}.{}", kind.extension());
        let local_path = self.local_dir.join(&file_name);
        self.write_local(&local_path, &file_name, buffer).await?;
        let checksum = format!("{:x}", Sha256::digest(buffer));
        debug!(path = %local_path.display(), %checksum, "Artifact written locally");

        let (remote_uri, remote_pending) =
            match self.remote.put(&file_name, buffer, kind.content_type()).await {
                Ok(uri) => (Some(uri), false),
                Err(error) => {
                    warn!(
                        request_id,
                        store = %self.remote.location(),
                        %error,
                        "Remote write failed; keeping local artifact"
                    );
                    (None, true)
                }
            };

        let artifact = Artifact {
            id: Uuid::new_v4(),
            request_id: request_id.to_string(),
            kind,
            public_path: format!(
                "{}/{file_name}",
                self.public_prefix.trim_end_matches('/')
            ),
            local_path,
            remote_uri,
            remote_pending,
            byte_size: buffer.len() as u64,
            checksum,
        };
        info!(
            request_id,
            kind = %kind,
            size = artifact.byte_size,
            remote = artifact.remote_uri.as_deref().unwrap_or("-"),
            "Artifact persisted"
        );
        Ok(artifact)
    }

    /// Write through a uniquely named dot-prefixed temp file and rename over
    /// the target, so concurrent writers of one name each land whole.
    async fn write_local(
        &self,
        path: &Path,
        file_name: &str,
        buffer: &[u8],
    ) -> Result<(), StorageError> {
        let local_error = |source| StorageError::LocalWrite {
            path: path.to_path_buf(),
            source,
        };
        fs::create_dir_all(&self.local_dir)
            .await
            .map_err(local_error)?;
        let staging = self
            .local_dir
            .join(format!(".{file_name}.{}.tmp", Uuid::new_v4().simple()));
        fs::write(&staging, buffer).await.map_err(local_error)?;
        if let Err(source) = fs::rename(&staging, path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(local_error(source));
        }
        Ok(())
    }
}
