//! Blogdesk API Server
//!
//! Run with: cargo run --bin blogdesk-api
//!
//! # Configuration
//!
//! Read from `--config`, else the default locations (see `blogdesk config`).
//! Environment variables override the file:
//! - `BLOGDESK_BACKEND_URL`: Row store base URL
//! - `BLOGDESK_ANON_KEY`: Anonymous API key
//! - `BLOGDESK_SERVICE_ROLE_KEY`: Elevated key for probes and deletes (optional)
//! - `BLOGDESK_CACHE_PATH`: SQLite cache file
//! - `BLOGDESK_API_HOST` / `BLOGDESK_API_PORT`: Bind address (default: 0.0.0.0:8086)
//! - `BLOGDESK_LOG_LEVEL` / `BLOGDESK_LOG_FORMAT`: Logging (default: info, pretty)
//! - `RUST_LOG`: Full filter directive, wins over the level above

use anyhow::Context;
use blogdesk::api::{serve, AppState};
use blogdesk::config::Config;
use blogdesk::logging::init_logging;
use blogdesk::service::DataService;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "blogdesk-api")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "HTTP API for the blog administration console")]
struct Args {
    /// Config file (default: search the standard locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Probe the backend before accepting requests
    #[arg(long)]
    warm: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };

    init_logging(&config.logging).context("Failed to initialize logging")?;

    tracing::info!("Starting Blogdesk API server v{}", env!("CARGO_PKG_VERSION"));
    let cache = if config.cache.in_memory {
        "memory".to_string()
    } else {
        config.cache.resolved_path().display().to_string()
    };
    tracing::info!(
        backend = %config.backend.url,
        elevated_key = config.backend.service_role_key.is_some(),
        cache = %cache,
        "Configuration loaded"
    );

    let service = Arc::new(DataService::from_config(&config).context("Failed to build data service")?);

    if args.warm {
        let connected = service.check_connection().await;
        tracing::info!(connected, "Initial connection check finished");
    }

    let state = AppState::new(service, config.api.clone());

    tracing::info!("Starting server on {}", config.api.addr());
    serve(state, &config.api).await?;

    tracing::info!("Blogdesk API server stopped");
    Ok(())
}
