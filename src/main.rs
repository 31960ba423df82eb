//! Dev API Vault
//!
//! # Architecture Overview
//!
//! ```text
//!   Client request
//!       │
//!       ▼
//!   tower-http layers (request id, trace, CORS, timeout, body limit)
//!       │
//!       ├── GET /, /health ──────────────────────────────▶ liveness
//!       │
//!       ▼  /api/v1/*
//!   admission gate
//!       credential ─▶ rate limit ─▶ body read + validation
//!       │  (403)        (429)         (422)
//!       ▼
//!   utility toolkit
//!       markdown │ qr │ image │ regex │ word count │ summarize
//!       │
//!       ▼
//!   JSON response + X-RateLimit-* headers
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use dev_api_vault::config::load_config;
use dev_api_vault::http::HttpServer;
use dev_api_vault::lifecycle::{shutdown_signal, Shutdown};
use dev_api_vault::observability::{init_tracing, metrics};

#[derive(Debug, Parser)]
#[command(name = "dev-api-vault", version, about = "Gated developer utility API")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref(), |key| std::env::var(key).ok())?;
    init_tracing(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.service.environment,
        "dev-api-vault starting"
    );
    tracing::info!(
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.trigger();
    });

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.wait()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
