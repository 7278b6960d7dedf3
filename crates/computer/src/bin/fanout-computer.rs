//! fanout-computer: a worker process.
//!
//! Binds its own endpoint, registers with a Space and executes whatever its
//! proxy hands over until the Space shuts it down.
//!
//! # Usage
//!
//! ```bash
//! # Local IPC (default endpoints)
//! fanout-computer
//!
//! # Remote Space, listening on TCP and advertising a reachable address
//! fanout-computer --space tcp://10.0.0.5:17000 \
//!     --endpoint tcp://0.0.0.0:17001 --advertise tcp://10.0.0.7:17001
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use fanout_computer::{ComputerService, LocalComputer};
use fanout_wire::{FanoutConfig, ProxyLink, SpaceClient, Transport};

/// Worker for distributed divide-and-conquer jobs.
#[derive(Parser, Debug)]
#[command(name = "fanout-computer", version, about)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, env = "FANOUT_CONFIG")]
    config: Option<PathBuf>,

    /// Space endpoint; overrides `space.endpoint`.
    #[arg(long)]
    space: Option<String>,

    /// Endpoint to listen on; overrides `computer.endpoint`.
    #[arg(long)]
    endpoint: Option<String>,

    /// Endpoint the Space should dial back, when it differs from the bind
    /// address.
    #[arg(long)]
    advertise: Option<String>,

    /// Execution threads; overrides `computer.threads`.
    #[arg(long)]
    threads: Option<usize>,
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
    tracing::info!(?cli, "starting fanout-computer");

    let mut config = FanoutConfig::load(cli.config.as_deref())?;
    if let Some(threads) = cli.threads {
        config.computer.threads = threads;
    }
    let space_transport = match &cli.space {
        Some(endpoint) => Transport::parse(endpoint)?,
        None => config.space_transport()?,
    };
    let listen = match &cli.endpoint {
        Some(endpoint) => Transport::parse(endpoint)?,
        None => config.computer_transport()?,
    };
    let advertise = match &cli.advertise {
        Some(endpoint) => Transport::parse(endpoint)?,
        None => listen.clone(),
    };

    let computer = Arc::new(LocalComputer::new(config.computer.resolved_threads())?);

    // Listen before registering: the Space dials back as soon as it accepts us.
    let service = ComputerService::bind(computer.clone(), &listen).await?;

    let space = Arc::new(
        SpaceClient::connect(
            &space_transport,
            config.space_call_timeout(),
            config.take_wait(),
        )
        .await?,
    );
    let proxy_id = space
        .register(&advertise.endpoint(), computer.capacity())
        .await?;
    tracing::info!(%proxy_id, capacity = computer.capacity(), "registered with space");
    computer.attach(Arc::new(ProxyLink::new(space, proxy_id)));

    let computer_for_signal = computer.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("shutdown signal received");
        if let Err(e) = fanout_core::Computer::shutdown(computer_for_signal.as_ref()).await {
            tracing::warn!(error = %e, "shutdown failed");
        }
    });

    service.run().await?;

    tracing::info!("fanout-computer exited cleanly");
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
