//! Standalone x402 facilitator server.
//!
//! # Usage
//!
//! ```bash
//! # Run with default config (config.toml in current directory)
//! cargo run -p x402-facilitator --release
//!
//! # Run with a custom config path
//! CONFIG=/path/to/config.toml cargo run -p x402-facilitator
//!
//! # Configure logging level
//! RUST_LOG=info cargo run -p x402-facilitator
//! ```
//!
//! # Environment variables
//!
//! - `CONFIG` — path to the TOML configuration file (default: `config.toml`)
//! - `HOST` — override the bind address (default: `0.0.0.0`)
//! - `PORT` — override the port (default: `4021`)
//! - `RPC_URL` — override the Solana RPC endpoint
//! - `RUST_LOG` — log level filter (default: `info`)

mod config;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::http::Method;
use clap::Parser;
use tower_http::cors;
use tracing_subscriber::EnvFilter;

use x402_ledger::{InMemoryReplayCache, LedgerFacilitator, ReplayCache, RpcLedgerClient};

use config::FacilitatorConfig;

/// Command-line overrides layered on top of the TOML configuration.
#[derive(Debug, Parser)]
#[command(name = "x402-facilitator", about = "HTTP facilitator for the x402 payment protocol")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, env = "CONFIG")]
    config: Option<String>,

    /// Override the bind address.
    #[arg(long, env = "HOST")]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long, env = "PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();

    if let Err(e) = run().await {
        tracing::error!("facilitator failed: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        // SAFETY-equivalent: single-threaded at startup, before any other
        // env access races it.
        unsafe {
            std::env::set_var("CONFIG", path);
        }
    }

    let mut config = FacilitatorConfig::load()?;
    if let Some(host) = &cli.host {
        if let Ok(addr) = host.parse() {
            config.host = addr;
        }
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    tracing::info!(host = %config.host, port = config.port, rpc_url = %config.rpc_url, networks = ?config.networks, "loaded configuration");

    let client = Arc::new(RpcLedgerClient::new(config.rpc_url.clone(), Duration::from_secs(10)));
    let clock: Arc<dyn x402_core::clock::Clock> = Arc::new(x402_core::clock::SystemClock);
    let replay: Arc<dyn ReplayCache> = Arc::new(InMemoryReplayCache::new(Arc::clone(&clock)));
    let min_replay_ttl = Duration::from_secs(config.min_replay_ttl_seconds);

    let facilitator = Arc::new(LedgerFacilitator::new(client, replay, min_replay_ttl, config.networks.clone()));

    let app = axum::Router::new()
        .merge(x402_http::facilitator::router(facilitator))
        .route("/health", axum::routing::get(health))
        .layer(cors::CorsLayer::new().allow_origin(cors::Any).allow_methods([Method::GET, Method::POST]).allow_headers(cors::Any));

    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("facilitator listening on http://{addr}");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    tracing::info!("facilitator shut down gracefully");
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Waits for Ctrl-C or SIGTERM (Unix) to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => tracing::info!("received Ctrl-C, shutting down"),
            _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.expect("failed to listen for Ctrl-C");
        tracing::info!("received Ctrl-C, shutting down");
    }
}
