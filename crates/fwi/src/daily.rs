//! Daily FWI raster pipeline.
//!
//! Computes the six indices for each date of a run, in dependency order:
//! drought code and duff moisture from yesterday's values and today's
//! weather, build-up from today's codes, fine fuel moisture from
//! yesterday's, initial spread from today's fine fuel moisture and wind,
//! and the fire weather index from spread and build-up. Each day's
//! outputs feed the next day's predecessor lookups, so dates run
//! strictly in order.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use tracing::{debug, info, warn};

use raster::{RasterHandle, ResampleMethod};
use sfms_common::time::{model_run_for_hour, DAILY_TARGET_HOUR_UTC};
use sfms_common::{FwiParameter, RunType, SfmsResult};
use storage::{ObjectStorage, RasterKeyAddresser, WeatherKeys};

use crate::formulas::IndexFormulas;
use crate::grid::{apply_cellwise, latitude_grid};
use crate::stage::{StageOutcome, StageReport, StageState};

/// Humidity warps are clamped here; resampling can overshoot 100.
const MAX_RELATIVE_HUMIDITY: f32 = 100.0;

/// Calculates daily FWI rasters for a date range.
pub struct DailyFwiProcessor {
    start: DateTime<Utc>,
    days: u32,
    run_type: RunType,
    addresser: RasterKeyAddresser,
    formulas: Arc<dyn IndexFormulas>,
}

impl DailyFwiProcessor {
    /// Formula implementations are injected here; the engine holds no
    /// ambient calculation state.
    pub fn new(
        start: DateTime<Utc>,
        days: u32,
        run_type: RunType,
        addresser: RasterKeyAddresser,
        formulas: Arc<dyn IndexFormulas>,
    ) -> Self {
        Self {
            start,
            days,
            run_type,
            addresser,
            formulas,
        }
    }

    /// Run the pipeline for every date, earliest first.
    ///
    /// A date whose inputs are not yet available ends the run with
    /// skipped stages; later dates could not resolve their predecessors
    /// anyway. Nothing partial is ever written: a stage persists its
    /// output in one put at its final address or not at all.
    pub async fn process(&self, storage: &ObjectStorage) -> SfmsResult<Vec<StageReport>> {
        let mut reports = Vec::new();

        for day in 0..self.days {
            let target = self.target_instant(day);
            let previous = target - Duration::days(1);
            info!(date = %target.date_naive(), run_type = %self.run_type, "daily FWI");

            let weather = self.weather_keys(target);
            if !storage.all_exist(weather.as_vec()).await? {
                warn!(date = %target.date_naive(), "weather inputs not yet available");
                reports.extend(self.skip_all(&format!(
                    "weather inputs for {}",
                    target.date_naive()
                )));
                break;
            }

            let mut predecessors = Vec::new();
            let mut missing_predecessor = None;
            for param in [FwiParameter::Dc, FwiParameter::Dmc, FwiParameter::Ffmc] {
                match self.resolve_predecessor(storage, previous, param).await? {
                    Some(key) => predecessors.push(key),
                    None => {
                        missing_predecessor =
                            Some(format!("{} for {}", param, previous.date_naive()));
                        break;
                    }
                }
            }
            if let Some(missing) = missing_predecessor {
                warn!(%missing, "predecessor raster not yet available");
                reports.extend(self.skip_all(&missing));
                break;
            }
            let (prev_dc, prev_dmc, prev_ffmc) =
                (&predecessors[0], &predecessors[1], &predecessors[2]);

            // Carry-forward indices, then the derived ones, in order.
            let dc = self
                .primary_stage(storage, target, FwiParameter::Dc, prev_dc, &weather)
                .await?;
            let dmc = self
                .primary_stage(storage, target, FwiParameter::Dmc, prev_dmc, &weather)
                .await?;
            let ffmc = self
                .primary_stage(storage, target, FwiParameter::Ffmc, prev_ffmc, &weather)
                .await?;
            let bui = self.bui_stage(storage, target).await?;
            let isi = self.isi_stage(storage, target, &weather).await?;
            let fwi = self.fwi_stage(storage, target).await?;

            reports.extend([dc, dmc, ffmc, bui, isi, fwi]);
        }

        Ok(reports)
    }

    /// The UTC instant a day's rasters are computed for.
    fn target_instant(&self, day: u32) -> DateTime<Utc> {
        (self.start + Duration::days(i64::from(day)))
            .date_naive()
            .and_hms_opt(DAILY_TARGET_HOUR_UTC, 0, 0)
            .expect("static hour is valid")
            .and_utc()
    }

    fn weather_keys(&self, target: DateTime<Utc>) -> WeatherKeys {
        match self.run_type {
            RunType::Forecast => {
                let run_hour = model_run_for_hour(self.start.hour());
                let model_run_start = self
                    .start
                    .date_naive()
                    .and_hms_opt(run_hour, 0, 0)
                    .expect("static hour is valid")
                    .and_utc();
                let prediction_hour = (target - model_run_start).num_hours().max(0) as u32;
                self.addresser
                    .weather_data_keys(self.start, target, prediction_hour)
            }
            RunType::Actual => self.addresser.interpolated_weather_keys(target),
        }
    }

    /// Existence-checked predecessor lookup: calculated first, uploaded
    /// as the single fallback.
    async fn resolve_predecessor(
        &self,
        storage: &ObjectStorage,
        previous: DateTime<Utc>,
        param: FwiParameter,
    ) -> SfmsResult<Option<String>> {
        let chain = self
            .addresser
            .predecessor_chain(previous, param, self.run_type);
        if storage.exists(&chain.calculated).await? {
            return Ok(Some(chain.calculated));
        }
        if storage.exists(&chain.uploaded).await? {
            return Ok(Some(chain.uploaded));
        }
        Ok(None)
    }

    fn skip_all(&self, missing: &str) -> Vec<StageReport> {
        [
            FwiParameter::Dc,
            FwiParameter::Dmc,
            FwiParameter::Ffmc,
            FwiParameter::Bui,
            FwiParameter::Isi,
            FwiParameter::Fwi,
        ]
        .into_iter()
        .map(|param| StageReport {
            param,
            outcome: StageOutcome::Skipped {
                missing: missing.to_string(),
            },
        })
        .collect()
    }

    /// One carry-forward index: dc, dmc or ffmc.
    async fn primary_stage(
        &self,
        storage: &ObjectStorage,
        target: DateTime<Utc>,
        param: FwiParameter,
        predecessor_key: &str,
        weather: &WeatherKeys,
    ) -> SfmsResult<StageReport> {
        let output_key = self
            .addresser
            .calculated_index_key(target, param, self.run_type);
        if storage.exists(&output_key).await? {
            debug!(key = %output_key, "output already persisted; no-op");
            return Ok(StageReport {
                param,
                outcome: StageOutcome::AlreadyDone,
            });
        }
        debug!(%param, state = ?StageState::InputsChecked, "stage advanced");

        // The predecessor raster defines the grid everything warps onto.
        let reference = open_raster(storage, predecessor_key).await?;
        let temp = open_raster(storage, &weather.temp)
            .await?
            .warp_to_match(&reference, ResampleMethod::Bilinear, None)?;
        let rh = open_raster(storage, &weather.rh)
            .await?
            .warp_to_match(&reference, ResampleMethod::Bilinear, Some(MAX_RELATIVE_HUMIDITY))?;
        let precip = open_raster(storage, &weather.precip)
            .await?
            .warp_to_match(&reference, ResampleMethod::Bilinear, None)?;
        debug!(%param, state = ?StageState::InputsWarped, "stage advanced");

        let month = target.month();
        let formulas = Arc::clone(&self.formulas);
        let result = match param {
            FwiParameter::Dc => {
                let latitude = latitude_raster(&reference)?;
                apply_cellwise(&[&reference, &temp, &precip, &latitude], |v| {
                    formulas.dc(v[0], v[1], v[2], v[3], month)
                })?
            }
            FwiParameter::Dmc => {
                let latitude = latitude_raster(&reference)?;
                apply_cellwise(&[&reference, &temp, &rh, &precip, &latitude], |v| {
                    formulas.dmc(v[0], v[1], v[2], v[3], v[4], month)
                })?
            }
            FwiParameter::Ffmc => {
                let wind = open_raster(storage, &weather.wind_speed)
                    .await?
                    .warp_to_match(&reference, ResampleMethod::Bilinear, None)?;
                apply_cellwise(&[&reference, &temp, &rh, &wind, &precip], |v| {
                    formulas.ffmc(v[0], v[1], v[2], v[3], v[4])
                })?
            }
            other => {
                return Err(sfms_common::SfmsError::Config(format!(
                    "{} is not a carry-forward index",
                    other
                )))
            }
        };
        debug!(%param, state = ?StageState::Computed, "stage advanced");

        self.persist(storage, &result, &output_key).await?;
        debug!(%param, state = ?StageState::Persisted, key = %output_key, "stage advanced");
        Ok(StageReport {
            param,
            outcome: StageOutcome::Persisted { key: output_key },
        })
    }

    /// Build-up index from today's just-persisted dmc and dc.
    async fn bui_stage(
        &self,
        storage: &ObjectStorage,
        target: DateTime<Utc>,
    ) -> SfmsResult<StageReport> {
        let output_key =
            self.addresser
                .calculated_index_key(target, FwiParameter::Bui, self.run_type);
        if storage.exists(&output_key).await? {
            return Ok(StageReport {
                param: FwiParameter::Bui,
                outcome: StageOutcome::AlreadyDone,
            });
        }

        let dmc_key =
            self.addresser
                .calculated_index_key(target, FwiParameter::Dmc, self.run_type);
        let dc_key = self
            .addresser
            .calculated_index_key(target, FwiParameter::Dc, self.run_type);
        let dmc = open_raster(storage, &dmc_key).await?;
        let dc = open_raster(storage, &dc_key).await?;

        let formulas = Arc::clone(&self.formulas);
        let result = apply_cellwise(&[&dmc, &dc], |v| formulas.bui(v[0], v[1]))?;

        self.persist(storage, &result, &output_key).await?;
        Ok(StageReport {
            param: FwiParameter::Bui,
            outcome: StageOutcome::Persisted { key: output_key },
        })
    }

    /// Initial spread index from today's ffmc and the wind raster.
    async fn isi_stage(
        &self,
        storage: &ObjectStorage,
        target: DateTime<Utc>,
        weather: &WeatherKeys,
    ) -> SfmsResult<StageReport> {
        let output_key =
            self.addresser
                .calculated_index_key(target, FwiParameter::Isi, self.run_type);
        if storage.exists(&output_key).await? {
            return Ok(StageReport {
                param: FwiParameter::Isi,
                outcome: StageOutcome::AlreadyDone,
            });
        }

        let ffmc_key =
            self.addresser
                .calculated_index_key(target, FwiParameter::Ffmc, self.run_type);
        let ffmc = open_raster(storage, &ffmc_key).await?;
        let wind = open_raster(storage, &weather.wind_speed)
            .await?
            .warp_to_match(&ffmc, ResampleMethod::Bilinear, None)?;

        let formulas = Arc::clone(&self.formulas);
        let result = apply_cellwise(&[&ffmc, &wind], |v| formulas.isi(v[0], v[1]))?;

        self.persist(storage, &result, &output_key).await?;
        Ok(StageReport {
            param: FwiParameter::Isi,
            outcome: StageOutcome::Persisted { key: output_key },
        })
    }

    /// Fire weather index from today's isi and bui.
    async fn fwi_stage(
        &self,
        storage: &ObjectStorage,
        target: DateTime<Utc>,
    ) -> SfmsResult<StageReport> {
        let output_key =
            self.addresser
                .calculated_index_key(target, FwiParameter::Fwi, self.run_type);
        if storage.exists(&output_key).await? {
            return Ok(StageReport {
                param: FwiParameter::Fwi,
                outcome: StageOutcome::AlreadyDone,
            });
        }

        let isi_key =
            self.addresser
                .calculated_index_key(target, FwiParameter::Isi, self.run_type);
        let bui_key =
            self.addresser
                .calculated_index_key(target, FwiParameter::Bui, self.run_type);
        let isi = open_raster(storage, &isi_key).await?;
        let bui = open_raster(storage, &bui_key).await?;

        let formulas = Arc::clone(&self.formulas);
        let result = apply_cellwise(&[&isi, &bui], |v| formulas.fwi(v[0], v[1]))?;

        self.persist(storage, &result, &output_key).await?;
        Ok(StageReport {
            param: FwiParameter::Fwi,
            outcome: StageOutcome::Persisted { key: output_key },
        })
    }

    /// Export and upload in one buffered put; forecast outputs also get
    /// their tiled web companion.
    async fn persist(
        &self,
        storage: &ObjectStorage,
        result: &RasterHandle,
        key: &str,
    ) -> SfmsResult<()> {
        let bytes = result.export()?;
        storage.put(key, bytes).await?;

        if self.run_type == RunType::Forecast {
            let companion_key = self.addresser.companion_key(key)?;
            let companion = result.export_web_tiled()?;
            storage.put(&companion_key, companion).await?;
        }
        Ok(())
    }
}

/// Fetch and decode one raster from storage.
pub(crate) async fn open_raster(storage: &ObjectStorage, key: &str) -> SfmsResult<RasterHandle> {
    let bytes = storage.get(key).await?;
    RasterHandle::from_bytes(&bytes)
}

/// Latitudes as a raster aligned with the reference, so cellwise
/// application can consume them like any other input.
fn latitude_raster(reference: &RasterHandle) -> SfmsResult<RasterHandle> {
    let latitudes: Vec<f32> = latitude_grid(reference).into_iter().map(|v| v as f32).collect();
    RasterHandle::from_array(
        latitudes,
        reference.width(),
        reference.height(),
        reference.geo_transform(),
        reference.spatial_ref(),
        None,
    )
}
