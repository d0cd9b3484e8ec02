//! REST-only entry point
//!
//! Runs the HTTP debug bridge without reading stdin.

use clap::Parser;
use std::error::Error;
use std::net::SocketAddr;
use whisperwynd_mcp::{Cli, RunMode, run};

#[derive(Parser)]
#[command(name = "whisperwynd-mcp-rest", about = "whisperwynd HTTP debug bridge")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<String>,

    /// Bind address (overrides config if specified)
    #[arg(long)]
    addr: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    run(Cli {
        config: args.config,
        mode: RunMode::Rest,
        rest_addr: args.addr,
    })
    .await
}
