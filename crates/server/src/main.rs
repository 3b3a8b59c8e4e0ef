//! augments-mcp server entry point.
//!
//! Boots the documentation service and serves it over the MCP stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use augments_core::{AppConfig, AppContext};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    let providers = augments_client::build_providers(&config).context("building providers")?;

    tracing::info!(
        frameworks_dir = %config.frameworks_dir.display(),
        cache_dir = %config.cache_dir.display(),
        "Starting augments-mcp server on stdio transport"
    );

    let ctx = Arc::new(AppContext::new());
    ctx.initialize(config, providers).await.context("initializing documentation service")?;

    let result = serve(ctx.clone()).await;
    ctx.shutdown().await;
    result
}

async fn serve(ctx: Arc<AppContext>) -> Result<()> {
    if ctx.start_warmer()? {
        tracing::info!("cache warmer started");
    }

    let handler = handler::AugmentsServer::new(ctx);
    let server = serve_server(handler, stdio()).await?;

    tokio::select! {
        quit = server.waiting() => {
            quit?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received, shutting down");
        }
    }

    Ok(())
}
