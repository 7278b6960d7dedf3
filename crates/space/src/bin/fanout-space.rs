//! fanout-space: the coordinator process.
//!
//! Accepts tasks from clients, hands them to registered workers and returns
//! final results.
//!
//! # Usage
//!
//! ```bash
//! # Local IPC (default endpoints)
//! fanout-space
//!
//! # From a config file, overriding the endpoint
//! fanout-space --config fanout.toml --endpoint tcp://0.0.0.0:17000
//! ```

use std::path::PathBuf;

use clap::Parser;
use fanout_space::{Space, SpaceService};
use fanout_wire::{FanoutConfig, Transport};

/// Coordinator for distributed divide-and-conquer jobs.
#[derive(Parser, Debug)]
#[command(name = "fanout-space", version, about)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, env = "FANOUT_CONFIG")]
    config: Option<PathBuf>,

    /// Endpoint to listen on; overrides `space.endpoint`.
    #[arg(long)]
    endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    tracing::info!(?cli, "starting fanout-space");

    let config = FanoutConfig::load(cli.config.as_deref())?;
    let transport = match &cli.endpoint {
        Some(endpoint) => Transport::parse(endpoint)?,
        None => config.space_transport()?,
    };

    let space = Space::new();
    let service =
        SpaceService::bind(space.clone(), &transport, config.computer_call_timeout()).await?;

    let space_for_signal = space.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("shutdown signal received");
        space_for_signal.shutdown().await;
    });

    service.run().await?;

    tracing::info!("fanout-space exited cleanly");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {},
            _ = sigterm.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.expect("failed to listen for ctrl_c");
    }
}
