use super::error::StorageError;
use async_trait::async_trait;

/// Remote object store receiving a copy of every artifact.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Human readable location (endpoint and container) for logs
    fn location(&self) -> String;

    /// Upload `bytes` under `name`, overwriting, and return the public URI
    async fn put(&self, name: &str, bytes: &[u8], content_type: &str)
    -> Result<String, StorageError>;
}
