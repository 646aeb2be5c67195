//! Team assignment worker binary.

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use teamlock_worker::metrics::init_metrics;
use teamlock_worker::{AssignmentJob, WorkerConfig};

fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    if let Err(e) = init_tracing() {
        eprintln!("Failed to initialize logging: {e:#}");
        std::process::exit(1);
    }

    info!("Starting teamlock-worker");

    if let Err(e) = run() {
        error!("Run failed: {:#}", e);
        std::process::exit(1);
    }

    info!("Worker finished");
}

fn run() -> anyhow::Result<()> {
    let config = WorkerConfig::from_env().context("loading worker configuration")?;
    info!("Worker config: {:?}", config);

    let metrics = match config.metrics_path {
        Some(_) => match init_metrics() {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Metrics disabled: {}", e);
                None
            }
        },
        None => None,
    };

    let job = AssignmentJob::new(config);
    job.run(metrics.as_ref()).context("team assignment run")?;
    Ok(())
}

/// Colored output for dev, JSON for production.
fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("teamlock_media=info".parse()?)
        .add_directive("teamlock_worker=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .try_init()?;
    }
    Ok(())
}
