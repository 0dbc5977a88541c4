//! Fire weather raster pipeline runner.
//!
//! Computes daily and hourly FWI rasters from model or station-derived
//! weather surfaces, and interpolates station observations onto the
//! provincial grid.

mod config;
mod jobs;
mod stations;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::RunnerConfig;
use sfms_common::RunType;

#[derive(Parser, Debug)]
#[command(name = "sfms-runner")]
#[command(about = "Fire weather index raster pipeline")]
struct Args {
    /// Start instant (RFC 3339); defaults to now
    #[arg(long, global = true)]
    start: Option<DateTime<Utc>>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Daily FWI rasters from model weather grids
    DailyForecast {
        /// Number of consecutive days to process
        #[arg(long, default_value_t = 2)]
        days: u32,
    },
    /// Daily FWI rasters from station-interpolated surfaces
    DailyActual {
        #[arg(long, default_value_t = 1)]
        days: u32,
    },
    /// Interpolate station observations onto the provincial grid
    Interpolate,
    /// Hourly fine fuel moisture rasters
    HourlyFfmc {
        /// Number of model run hours to process
        #[arg(long, default_value_t = fwi::hourly::MAX_MODEL_RUN_HOUR)]
        hours: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .json()
        .init();

    let config = RunnerConfig::from_env()?;
    let start = args.start.unwrap_or_else(Utc::now);
    info!(%start, "starting sfms-runner");

    match args.command {
        Command::DailyForecast { days } => {
            jobs::run_daily(&config, start, days, RunType::Forecast).await
        }
        Command::DailyActual { days } => {
            jobs::run_daily(&config, start, days, RunType::Actual).await
        }
        Command::Interpolate => jobs::run_interpolation(&config, start).await,
        Command::HourlyFfmc { hours } => jobs::run_hourly(&config, start, hours).await,
    }
}
