mod archive;
mod config;
mod error;
mod monitoring;
mod notify;
mod orchestrator;
mod storage;
#[cfg(test)]
mod test_support;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use logger::LevelFilter;
use tracing::info;

use crate::archive::FileLogArchive;
use crate::config::Config;
use crate::monitoring::HttpProber;
use crate::notify::TwilioNotifier;
use crate::orchestrator::WorkerService;
use crate::storage::FileStorage;

/// Uptime checks worker: probes every stored check and texts owners on state changes
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Config file, defaults to $XDG_CONFIG_HOME/upcheck/config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run one sweep and one log rotation, then exit
    #[arg(long)]
    once: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    logger::init_tracing_with_level(if cli.verbose { LevelFilter::DEBUG } else { LevelFilter::INFO });

    let config = Config::from_config(cli.config.as_ref()).context("Failed to load configuration")?;
    info!("{config}");

    let storage = Arc::new(FileStorage::new(&config.storage.data_dir));
    let archive = Arc::new(FileLogArchive::new(&config.storage.log_dir));
    let prober = Arc::new(HttpProber::new().context("Failed to build HTTP client")?);
    let notifier =
        Arc::new(TwilioNotifier::new(config.twilio.clone()).context("Failed to build SMS client")?);
    info!("Reading checks from {}", storage.base_dir().display());

    let mut service = WorkerService::new(&config.workers, storage, archive, prober, notifier);

    if cli.once {
        let (sweep, rotation) = service.run_once().await;
        info!("Sweep: {sweep:?}");
        info!("Rotation: {rotation:?}");
        return Ok(());
    }

    service.start();
    tokio::signal::ctrl_c().await.context("Failed to listen for shutdown signal")?;
    info!("Shutdown requested");
    service.shutdown().await;

    Ok(())
}
