use clap::Parser;
use std::error::Error;
use whisperwynd_mcp::{Cli, run};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    run(Cli::parse()).await
}
