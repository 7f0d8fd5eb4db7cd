//! Server binary for the execution engine.
//!
//! Hosts the engine behind the JSON API so a visualizer front end can submit
//! code and render traces. Engine configuration comes from an optional YAML
//! file plus environment overrides; server knobs come from the command line.

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;
use std::time::Duration;

use tracelab_core::{Dispatcher, EngineConfig};
use tracelab_server::{shutdown_signal, ServerConfig, TraceServer};

#[derive(Parser, Debug)]
#[clap(author, version, about = "HTTP server for the tracelab execution engine")]
struct Cli {
    #[clap(long, short, help = "Path to the engine configuration YAML file")]
    config: Option<String>,

    #[clap(long, default_value = "127.0.0.1:3000")]
    bind_addr: String,

    #[clap(long, short, default_value = "info")]
    log_level: String,

    #[clap(long, help = "Disable CORS headers")]
    no_cors: bool,

    #[clap(
        long,
        default_value = "10",
        help = "Maximum execution requests per client per minute"
    )]
    rate_limit: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level_filter = cli.log_level.parse().unwrap_or(LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(log_level_filter)
        .init();

    let engine_config = match &cli.config {
        Some(path) => {
            log::info!("Loading engine configuration from: {}", path);
            EngineConfig::from_file(path)?
        }
        None => EngineConfig::load(),
    };
    engine_config.validate()?;

    let server_config = ServerConfig::default()
        .with_bind_addr_str(&cli.bind_addr)?
        .with_cors(!cli.no_cors)
        .with_rate_limit(cli.rate_limit, Duration::from_secs(60))
        .with_logging(true);

    log::info!("Starting execution server on {}...", server_config.bind_addr);

    let server = TraceServer::with_config(Dispatcher::new(engine_config), server_config);
    if let Err(e) = server.serve_with_shutdown(shutdown_signal()).await {
        log::error!("Server failed: {}", e);
        return Err(e.into());
    }

    log::info!("Execution server shut down gracefully.");
    Ok(())
}
