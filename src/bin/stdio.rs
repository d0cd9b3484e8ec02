//! Stdio-only entry point for MCP hosts that spawn the server as a subprocess.

use clap::Parser;
use std::error::Error;
use whisperwynd_mcp::{Cli, RunMode, run};

#[derive(Parser)]
#[command(name = "whisperwynd-mcp-stdio", about = "whisperwynd MCP tool server (stdio)")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    run(Cli {
        config: args.config,
        mode: RunMode::Stdio,
        rest_addr: None,
    })
    .await
}
