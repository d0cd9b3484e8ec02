//! whisperwynd-mcp: exposes slow, externally hosted image and document
//! generation workers as MCP tools over stdio and as an HTTP debug bridge.

pub mod application;
pub mod cli;
pub mod config;
pub mod constants;
pub mod domain;
pub mod infrastructure;

pub use application::{Gateway, stdio, tooling};
pub use cli::{Cli, RunMode};
pub use config::AppConfig;
pub use infrastructure::{rpc, server};

use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt};

pub async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    init_tracing();
    info!(mode = ?cli.mode, "Starting {}", constants::SERVER_NAME);
    debug!(config = ?cli.config, rest_addr = ?cli.rest_addr, "CLI arguments parsed");

    let config_path = cli.config.as_deref().map(Path::new);
    let config = AppConfig::load(config_path)?;
    match config_path {
        Some(path) => info!(path = %path.display(), "Loaded configuration from file"),
        None => info!("Loaded configuration from default path or defaults"),
    }
    let rest_addr = match cli.rest_addr {
        Some(addr) => addr,
        None => config.bind_addr()?,
    };

    let gateway = Arc::new(Gateway::from_config(&config)?);
    let cors_origins = config.server.cors_origins.clone();

    match cli.mode {
        RunMode::Stdio => stdio::run(gateway).await?,
        RunMode::Rest => {
            info!(addr = %rest_addr, "Starting REST server");
            server::serve(gateway, rest_addr, &cors_origins).await?;
        }
        RunMode::All => {
            info!(addr = %rest_addr, "Starting both STDIO and REST server");
            let rest_gateway = Arc::clone(&gateway);
            let rest_handle = tokio::spawn(async move {
                if let Err(e) = server::serve(rest_gateway, rest_addr, &cors_origins).await {
                    error!(error = %e, "REST server error");
                }
            });

            let stdio_result = stdio::run(gateway).await;
            rest_handle.abort();
            stdio_result?;
        }
    }
    info!("Shutdown complete");
    Ok(())
}

/// Install the global subscriber once. Logs go to stderr because stdout
/// carries protocol frames.
pub fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_level(true)
            .init();
    });
}
