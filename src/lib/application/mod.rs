//! # Application Module
//!
//! Orchestration core shared by both transports.
//!
//! - [`dispatcher`] - typed requests and submission to a worker
//! - [`poller`] - bounded exponential backoff until a terminal job state
//! - [`normalizer`] - worker output to a single byte buffer
//! - [`artifacts`] - local then remote persistence
//! - [`metrics`] - sliding window of invocation outcomes
//! - [`tooling`] - the closed tool and resource registry
//! - [`gateway`] - registry plus in-flight request tracking
//! - [`stdio`] - line-delimited protocol server

pub mod artifacts;
pub mod dispatcher;
pub mod gateway;
pub mod inflight;
pub mod metrics;
pub mod normalizer;
pub mod pipeline;
pub mod poller;
pub mod stdio;
pub mod tooling;

#[cfg(test)]
pub(crate) mod test_support;

pub use gateway::{BootstrapError, Gateway};
