use std::net::SocketAddr;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "whisperwynd-mcp",
    version,
    about = "MCP tool server and HTTP debug bridge for image and document generation"
)]
pub struct Cli {
    /// Settings file (defaults to config/server.toml when present)
    #[arg(long, short, env = "WHISPERWYND_CONFIG")]
    pub config: Option<String>,
    #[arg(long, short, value_enum, default_value_t = RunMode::Stdio)]
    pub mode: RunMode,
    /// Debug bridge bind address, overriding `[server] bind`
    #[arg(long)]
    pub rest_addr: Option<SocketAddr>,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum RunMode {
    /// Tool protocol on stdin/stdout
    Stdio,
    /// HTTP debug bridge
    Rest,
    /// Both, sharing one gateway; exits when stdin closes
    All,
}
