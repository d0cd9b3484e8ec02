//! Domain types shared by every layer: jobs, artifacts, envelopes and the error taxonomy.

pub mod artifact;
pub mod envelope;
pub mod error;
pub mod job;

pub use artifact::Artifact;
pub use envelope::{EnvelopeStatus, Operation, RequestEnvelope, ResponseEnvelope};
pub use error::{ErrorDetail, ErrorKind, ServiceError};
pub use job::{InvalidTransition, Job, JobHandle, JobKind, JobStatus};
