//! Application constants
//!
//! Single source of truth for paths and protocol identifiers.

/// Default settings file path
pub const CONFIG_PATH: &str = "config/server.toml";

/// Default environment file path
pub const ENV_PATH: &str = "config/.env";

/// Name reported during the MCP handshake and on `/health`
pub const SERVER_NAME: &str = "whisperwynd-mcp";

/// MCP protocol revision announced in `initialize`
pub const PROTOCOL_VERSION: &str = "2025-06-18";

/// URI scheme for resources exposed through discovery
pub const RESOURCE_SCHEME: &str = "whisperwynd://";
