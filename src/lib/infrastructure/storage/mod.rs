//! Remote artifact storage

pub mod azure;
pub mod error;
pub mod traits;

pub use azure::{AzureBlobStore, BlobAuth, ConnectionString};
pub use error::StorageError;
pub use traits::RemoteStore;
