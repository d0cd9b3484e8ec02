use crate::domain::ServiceError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to write local artifact {path:?}: {source}")]
    LocalWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid storage connection string: {0}")]
    ConnectionString(String),
    #[error("network error talking to blob store: {0}")]
    Network(#[from] reqwest::Error),
    #[error("blob store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to sign blob request: {0}")]
    Signing(String),
}

impl From<StorageError> for ServiceError {
    fn from(error: StorageError) -> Self {
        ServiceError::Storage(error.to_string())
    }
}
