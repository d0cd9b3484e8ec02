use super::job::JobKind;
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

/// Durable result of a succeeded job.
///
/// The local copy always exists; `remote_uri` is absent when the remote write
/// failed, in which case `remote_pending` is set.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: Uuid,
    pub request_id: String,
    pub kind: JobKind,
    pub local_path: PathBuf,
    /// Path under which the debug bridge serves the local copy.
    pub public_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_uri: Option<String>,
    pub remote_pending: bool,
    pub byte_size: u64,
    /// Lowercase hex SHA-256 of the stored bytes.
    pub checksum: String,
}
