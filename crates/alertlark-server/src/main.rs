//! Alertlark server binary.
//!
//! Receives Alertmanager webhooks and Lark card actions.

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use alertlark_server::{Cli, ProductionServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if cli.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = cli.into_config().context("invalid configuration")?;

    info!(
        bind_addr = %config.bind_addr,
        alertmanager = %config.alertmanager_host,
        redis = %config.redis().sanitized_url(),
        "starting alertlark"
    );

    let server = ProductionServer::connect(&config)
        .await
        .context("failed to initialise collaborators")?;

    if let Err(e) = server
        .serve_with_shutdown(config.bind_addr, shutdown_signal())
        .await
    {
        error!(error = %e, "server error");
        return Err(e.into());
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
