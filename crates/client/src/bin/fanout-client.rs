//! fanout-client: submits one job to a Space and prints its answer.
//!
//! # Usage
//!
//! ```bash
//! fanout-client fib 20
//! fanout-client --space tcp://10.0.0.5:17000 mandelbrot --pixels 512
//! fanout-client --json tsp --city 0,0 --city 0,3 --city 4,3 --city 4,0
//! ```

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use fanout_client::{EuclideanTspJob, FibonacciJob, Job, MandelbrotJob};
use fanout_core::ComputeSpace;
use fanout_wire::{FanoutConfig, SpaceClient, Transport};
use serde::Serialize;

/// Client for distributed divide-and-conquer jobs.
#[derive(Parser, Debug)]
#[command(name = "fanout-client", version, about)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, env = "FANOUT_CONFIG")]
    config: Option<PathBuf>,

    /// Space endpoint; overrides `space.endpoint`.
    #[arg(long)]
    space: Option<String>,

    /// Print the answer as JSON.
    #[arg(long)]
    json: bool,

    /// Shut the Space (and its workers) down after the job.
    #[arg(long)]
    shutdown: bool,

    #[command(subcommand)]
    job: JobCommand,
}

#[derive(Subcommand, Debug)]
enum JobCommand {
    /// Recursive Fibonacci.
    Fib {
        #[arg(default_value_t = 20)]
        n: u32,
    },
    /// Escape counts over a square of the complex plane.
    Mandelbrot {
        #[arg(long, default_value_t = -0.7510975859375, allow_hyphen_values = true)]
        lower_x: f64,
        #[arg(long, default_value_t = 0.1315680625, allow_hyphen_values = true)]
        lower_y: f64,
        #[arg(long, default_value_t = 0.01611)]
        edge_length: f64,
        #[arg(long, default_value_t = 1024)]
        pixels: u32,
        #[arg(long, default_value_t = 4096)]
        iteration_limit: u32,
        /// Deepest decomposition level.
        #[arg(long)]
        max_level: Option<i32>,
    },
    /// Shortest closed tour through a set of points.
    Tsp {
        /// City as `x,y`; repeat for each city. Defaults to a 6x4 grid.
        #[arg(long = "city", value_parser = parse_city, allow_hyphen_values = true)]
        cities: Vec<(f64, f64)>,
        /// Deepest decomposition level.
        #[arg(long)]
        max_level: Option<i32>,
    },
}

fn parse_city(value: &str) -> Result<(f64, f64), String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected `x,y`, got `{value}`"))?;
    let x = x.trim().parse().map_err(|e| format!("bad x in `{value}`: {e}"))?;
    let y = y.trim().parse().map_err(|e| format!("bad y in `{value}`: {e}"))?;
    Ok((x, y))
}

fn default_cities() -> Vec<(f64, f64)> {
    (1..=6)
        .flat_map(|x| (1..=4).map(move |y| (f64::from(x), f64::from(y))))
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = FanoutConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    let transport = match &cli.space {
        Some(endpoint) => Transport::parse(endpoint)?,
        None => config.space_transport()?,
    };
    let space = SpaceClient::connect(&transport, config.space_call_timeout(), config.take_wait())
        .await
        .context("failed to connect to space")?;

    let started = Instant::now();
    match cli.job {
        JobCommand::Fib { n } => {
            let value = FibonacciJob::new(n).run(&space).await?;
            report(cli.json, &value, || format!("fibonacci({n}) = {value}"))?;
        }
        JobCommand::Mandelbrot {
            lower_x,
            lower_y,
            edge_length,
            pixels,
            iteration_limit,
            max_level,
        } => {
            let mut job =
                MandelbrotJob::new(lower_x, lower_y, edge_length, pixels, iteration_limit)?;
            if let Some(max_level) = max_level {
                job = job.with_max_level(max_level);
            }
            let image = job.run(&space).await?;
            report(cli.json, &image, || {
                format!(
                    "{pixels}x{pixels} image, {:.2}% of pixels inside the set",
                    image.interior_ratio() * 100.0
                )
            })?;
        }
        JobCommand::Tsp { cities, max_level } => {
            let cities = if cities.is_empty() { default_cities() } else { cities };
            let mut job = EuclideanTspJob::new(&cities)?;
            if let Some(max_level) = max_level {
                job = job.with_max_level(max_level);
            }
            let tour = job.run(&space).await?;
            report(cli.json, &tour, || {
                let path: Vec<String> = tour.cities.iter().map(|c| format!("city{c}")).collect();
                format!("{}\ndistance: {:.4}", path.join(" --> "), tour.distance)
            })?;
        }
    }
    tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "job finished");

    if cli.shutdown {
        space.shutdown().await.context("failed to shut down space")?;
    }
    Ok(())
}

fn report<T: Serialize>(
    json: bool,
    value: &T,
    text: impl FnOnce() -> String,
) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text());
    }
    Ok(())
}
