mod cli;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use dockinfo::config::Settings;
use dockinfo::runtime::RuntimeClient;
use dockinfo::server::ApiServer;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref(), cli.overrides())?;
    settings.tracing.init_tracing()?;

    info!("🚀 dockinfo {} starting up...", env!("CARGO_PKG_VERSION"));
    info!(
        docker = %settings.connection,
        label_prefix = %settings.labels.prefix(),
        self_name = %settings.self_name,
        "Configuration loaded"
    );
    match &settings.cors {
        Some(policy) => info!(origins = ?policy.entries(), "CORS enabled"),
        None => warn!("CORS disabled"),
    }

    // Connects on the first request that needs the daemon.
    let client = Arc::new(RuntimeClient::new(settings.connection.clone()));
    let server = ApiServer::new(client, &settings);

    server.start(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
