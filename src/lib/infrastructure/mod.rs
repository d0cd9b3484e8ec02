//! Adapters to the outside world: worker HTTP client, blob store, JSON-RPC wire
//! types and the HTTP debug bridge.

pub mod rpc;
pub mod server;
pub mod storage;
pub mod worker;
