use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;

use hubitatd::{ConfigStore, Driver};

/// Bridge daemon exposing Hubitat Maker API devices as controllable entities.
#[derive(Debug, Parser)]
#[command(name = "hubitatd", version)]
struct Args {
    /// Directory holding config.json (default: $HUBITATD_CONFIG_HOME or the
    /// working directory)
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::from(args.log_level))
        .init();

    info!("hubitatd starting");

    let store = match args.config_dir {
        Some(dir) => ConfigStore::new(dir),
        None => ConfigStore::from_env(),
    };

    let mut driver = Driver::from_saved_config(store);
    if driver.is_configured() {
        driver.load_devices().await;
    } else {
        info!("no configuration found, waiting for setup");
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("received shutdown signal");

    driver.close();
    info!("hubitatd shutdown complete");

    Ok(())
}
