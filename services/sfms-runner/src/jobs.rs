//! Job wiring: storage, station feed, interpolation and FWI processors.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use fwi::{DailyFwiProcessor, HourlyFfmcProcessor, StageOutcome, VanWagnerFormulas};
use interpolation::source::StationFetcher;
use interpolation::SurfaceInterpolator;
use raster::RasterHandle;
use sfms_common::{InterpolatedParameter, RunType, SfmsResult};
use storage::{
    InMemoryRunLog, ObjectStorage, RasterKeyAddresser, RunBookkeeping,
};

use crate::config::RunnerConfig;
use crate::stations::JsonStationSource;

/// Run the daily FWI pipeline for a date range.
pub async fn run_daily(
    config: &RunnerConfig,
    start: DateTime<Utc>,
    days: u32,
    run_type: RunType,
) -> Result<()> {
    let storage = ObjectStorage::new(&config.storage)?;
    let addresser = RasterKeyAddresser::new();
    let run_log = InMemoryRunLog::new();
    let run = run_log
        .get_or_create_run("daily-fwi", run_type, start.date_naive())
        .await?;

    let processor = DailyFwiProcessor::new(
        start,
        days,
        run_type,
        addresser,
        Arc::new(VanWagnerFormulas),
    );
    let reports = processor.process(&storage).await?;

    let persisted = reports
        .iter()
        .filter(|r| matches!(r.outcome, StageOutcome::Persisted { .. }))
        .count();
    let skipped = reports
        .iter()
        .filter(|r| matches!(r.outcome, StageOutcome::Skipped { .. }))
        .count();
    info!(persisted, skipped, total = reports.len(), "daily run complete");

    if skipped == 0 {
        run_log.mark_processed(run.id).await?;
    }
    Ok(())
}

/// Run the hourly FFMC pipeline.
pub async fn run_hourly(config: &RunnerConfig, start: DateTime<Utc>, hours: u32) -> Result<()> {
    let storage = ObjectStorage::new(&config.storage)?;
    let run_log = InMemoryRunLog::new();
    let run = run_log
        .get_or_create_run("hourly-ffmc", RunType::Forecast, start.date_naive())
        .await?;

    let processor = HourlyFfmcProcessor::new(
        start,
        RasterKeyAddresser::new(),
        Arc::new(VanWagnerFormulas),
    );
    let reports = processor.process(&storage, hours).await?;
    let persisted = reports
        .iter()
        .filter(|r| matches!(r.outcome, StageOutcome::Persisted { .. }))
        .count();
    info!(persisted, total = reports.len(), "hourly run complete");

    if persisted == reports.len() {
        run_log.mark_processed(run.id).await?;
    }
    Ok(())
}

/// Interpolate station observations into the day's weather surfaces.
///
/// Temperature first (the humidity derivation needs its grid), then the
/// directly interpolated parameters.
pub async fn run_interpolation(config: &RunnerConfig, at: DateTime<Utc>) -> Result<()> {
    let storage = ObjectStorage::new(&config.storage)?;
    let addresser = RasterKeyAddresser::new();
    let run_log = InMemoryRunLog::new();
    let run = run_log
        .get_or_create_run("daily-interpolation", RunType::Actual, at.date_naive())
        .await?;

    let Some(stations_file) = &config.stations_file else {
        bail!("STATIONS_FILE is required for interpolation runs");
    };
    let fetcher = JsonStationSource::new(stations_file.clone());
    let stations = fetcher.daily_actuals(at).await?;
    if stations.is_empty() {
        bail!("no station observations for {}", at.date_naive());
    }
    info!(stations = stations.len(), date = %at.date_naive(), "interpolating daily actuals");

    let dem = open_raster(&storage, &addresser.dem_key())
        .await
        .context("terrain raster")?;
    let mask = open_raster(&storage, &addresser.mask_key())
        .await
        .context("province mask raster")?;
    let interpolator = SurfaceInterpolator::new();

    // Temperature, lapse-adjusted against the terrain.
    let (temperature, summary) =
        interpolator.temperature_surface(&stations, &dem, &dem, Some(&mask))?;
    let temp_key = addresser.interpolated_key(at, InterpolatedParameter::Temp);
    storage.put(&temp_key, temperature.export()?).await?;
    info!(key = %temp_key, ?summary, "stored temperature surface");

    // Humidity through the dew-point path against the temperature grid.
    let (humidity, summary) =
        interpolator.humidity_surface(&stations, &temperature, &dem, Some(&mask))?;
    let rh_key = addresser.interpolated_key(at, InterpolatedParameter::Rh);
    storage.put(&rh_key, humidity.export()?).await?;
    info!(key = %rh_key, ?summary, "stored humidity surface");

    // Directly interpolated parameters.
    for param in [
        InterpolatedParameter::Precip,
        InterpolatedParameter::WindSpeed,
        InterpolatedParameter::Ffmc,
        InterpolatedParameter::Dmc,
        InterpolatedParameter::Dc,
    ] {
        if !stations.iter().any(|s| s.value(param).is_some()) {
            warn!(param = %param, "no observations; surface not produced");
            continue;
        }
        let (surface, summary) =
            interpolator.plain_surface(param, &stations, &dem, Some(&mask))?;
        let key = addresser.interpolated_key(at, param);
        storage.put(&key, surface.export()?).await?;
        info!(key = %key, ?summary, "stored surface");
    }

    run_log.mark_processed(run.id).await?;
    Ok(())
}

async fn open_raster(storage: &ObjectStorage, key: &str) -> SfmsResult<RasterHandle> {
    let bytes = storage.get(key).await?;
    RasterHandle::from_bytes(&bytes)
}
