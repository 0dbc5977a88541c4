//! Hourly fine fuel moisture pipeline.
//!
//! A shorter cadence with its own predecessor rule: the seed is the most
//! recent uploaded hourly FFMC (one hour before the model run start in
//! operational time), and each computed hour becomes the next hour's
//! predecessor. Hour H is never computed before hour H-1 exists.

use std::sync::Arc;

use chrono::{DateTime, Duration, Timelike, Utc};
use tracing::{debug, info, warn};

use raster::ResampleMethod;
use sfms_common::time::model_run_for_hour;
use sfms_common::{FwiParameter, SfmsResult};
use storage::{ObjectStorage, RasterKeyAddresser};

use crate::daily::open_raster;
use crate::formulas::IndexFormulas;
use crate::grid::apply_cellwise;
use crate::stage::{StageOutcome, StageReport};

/// Longest model run the hourly pipeline walks, hours.
pub const MAX_MODEL_RUN_HOUR: u32 = 48;

/// Humidity warps are clamped here; resampling can overshoot 100.
const MAX_RELATIVE_HUMIDITY: f32 = 100.0;

/// Calculates forecasted hourly FFMC rasters.
pub struct HourlyFfmcProcessor {
    start: DateTime<Utc>,
    addresser: RasterKeyAddresser,
    formulas: Arc<dyn IndexFormulas>,
}

impl HourlyFfmcProcessor {
    pub fn new(
        start: DateTime<Utc>,
        addresser: RasterKeyAddresser,
        formulas: Arc<dyn IndexFormulas>,
    ) -> Self {
        Self {
            start,
            addresser,
            formulas,
        }
    }

    /// Walk hours 0..`hours_to_process` of the most recent model run.
    ///
    /// Stops at the first hour whose weather is not yet available; a
    /// later run resumes there from key existence alone.
    pub async fn process(
        &self,
        storage: &ObjectStorage,
        hours_to_process: u32,
    ) -> SfmsResult<Vec<StageReport>> {
        let run_hour = model_run_for_hour(self.start.hour());
        let model_run_start = self
            .start
            .date_naive()
            .and_hms_opt(run_hour, 0, 0)
            .expect("static hour is valid")
            .and_utc();

        let seed_key = self.addresser.uploaded_hourly_ffmc_key(model_run_start);
        if !storage.exists(&seed_key).await? {
            warn!(key = %seed_key, "seed hourly FFMC not yet uploaded");
            return Ok(vec![StageReport {
                param: FwiParameter::Ffmc,
                outcome: StageOutcome::Skipped { missing: seed_key },
            }]);
        }

        let mut reports = Vec::new();
        let mut predecessor_key = seed_key;

        for hour in 0..hours_to_process.min(MAX_MODEL_RUN_HOUR) {
            let target = model_run_start + Duration::hours(i64::from(hour));
            let output_key = self.addresser.calculated_hourly_ffmc_key(target);

            if storage.exists(&output_key).await? {
                debug!(key = %output_key, "hour already persisted; no-op");
                predecessor_key = output_key;
                reports.push(StageReport {
                    param: FwiParameter::Ffmc,
                    outcome: StageOutcome::AlreadyDone,
                });
                continue;
            }

            let weather = self
                .addresser
                .weather_data_keys_hourly(model_run_start, hour);
            if !storage.all_exist(weather.as_vec()).await? {
                warn!(hour, "hourly weather not yet available; stopping");
                reports.push(StageReport {
                    param: FwiParameter::Ffmc,
                    outcome: StageOutcome::Skipped {
                        missing: format!("hourly weather at offset {}", hour),
                    },
                });
                break;
            }

            info!(hour, target = %target, "hourly FFMC");
            let reference = open_raster(storage, &predecessor_key).await?;
            let temp = open_raster(storage, &weather.temp)
                .await?
                .warp_to_match(&reference, ResampleMethod::Bilinear, None)?;
            let rh = open_raster(storage, &weather.rh).await?.warp_to_match(
                &reference,
                ResampleMethod::Bilinear,
                Some(MAX_RELATIVE_HUMIDITY),
            )?;
            let wind = open_raster(storage, &weather.wind_speed)
                .await?
                .warp_to_match(&reference, ResampleMethod::Bilinear, None)?;
            let precip = open_raster(storage, &weather.precip)
                .await?
                .warp_to_match(&reference, ResampleMethod::Bilinear, None)?;

            let formulas = Arc::clone(&self.formulas);
            let result = apply_cellwise(&[&reference, &temp, &rh, &wind, &precip], |v| {
                formulas.ffmc(v[0], v[1], v[2], v[3], v[4])
            })?;

            let bytes = result.export()?;
            storage.put(&output_key, bytes).await?;
            reports.push(StageReport {
                param: FwiParameter::Ffmc,
                outcome: StageOutcome::Persisted {
                    key: output_key.clone(),
                },
            });
            predecessor_key = output_key;
        }

        Ok(reports)
    }
}
