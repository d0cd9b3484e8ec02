//! JSON-RPC 2.0 wire types for MCP framing on stdio.

pub mod types;

pub use types::{
    INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION, METHOD_NOT_FOUND, PARSE_ERROR, RpcError,
    RpcRequest, RpcResponse,
};
