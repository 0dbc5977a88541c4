//! Artifact addressing: the pure mapping from (parameter, instant,
//! cadence, run type) to canonical object storage keys.
//!
//! Uploaded rasters are named by the calendar date in the fixed
//! operational time zone, regardless of the instant's UTC clock time;
//! calculated rasters are named by UTC date and namespaced by run type so
//! model-driven and station-driven artifacts never collide. Everything
//! here is a deterministic function of its arguments.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};

use sfms_common::time::{
    compact_date, model_run_for_hour, operational_date, to_operational_time,
};
use sfms_common::{FwiParameter, InterpolatedParameter, RunType, SfmsError, SfmsResult,
    WeatherParameter};

/// Lookup chain for a carry-forward parameter's previous-period raster.
///
/// The engine tries the calculated key first and falls back to the
/// uploaded ground-truth key for the same date; no other candidates
/// exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredecessorChain {
    pub calculated: String,
    pub uploaded: String,
}

/// Model weather keys feeding one daily calculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherKeys {
    pub temp: String,
    pub rh: String,
    pub wind_speed: String,
    pub precip: String,
}

impl WeatherKeys {
    pub fn as_vec(&self) -> Vec<String> {
        vec![
            self.temp.clone(),
            self.rh.clone(),
            self.wind_speed.clone(),
            self.precip.clone(),
        ]
    }
}

/// Encapsulates addressing of model and weather data rasters in object
/// storage.
#[derive(Debug, Clone)]
pub struct RasterKeyAddresser {
    calculated_prefix: String,
    daily_upload_prefix: String,
    hourly_upload_prefix: String,
    interpolated_prefix: String,
    static_prefix: String,
    weather_model_prefix: String,
}

impl Default for RasterKeyAddresser {
    fn default() -> Self {
        Self {
            calculated_prefix: "sfms/calculated".to_string(),
            daily_upload_prefix: "sfms/uploads/actual".to_string(),
            hourly_upload_prefix: "sfms/uploads/hourlies".to_string(),
            interpolated_prefix: "sfms/interpolated".to_string(),
            static_prefix: "sfms/static".to_string(),
            weather_model_prefix: "weather_models/rdps".to_string(),
        }
    }
}

impl RasterKeyAddresser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key of an uploaded (ground truth) daily index raster.
    ///
    /// The date is resolved in the operational time zone.
    pub fn uploaded_index_key(&self, at: DateTime<Utc>, param: FwiParameter) -> String {
        let date = operational_date(at);
        format!(
            "{}/{}/{}{}.tif",
            self.daily_upload_prefix,
            date,
            param.key_name(),
            compact_date(date)
        )
    }

    /// Key of a calculated daily index raster, namespaced by run type.
    pub fn calculated_index_key(
        &self,
        at: DateTime<Utc>,
        param: FwiParameter,
        run_type: RunType,
    ) -> String {
        let date = at.date_naive();
        format!(
            "{}/{}/{}/{}{}.tif",
            self.calculated_prefix,
            run_type,
            date,
            param.key_name(),
            compact_date(date)
        )
    }

    /// Both predecessor candidates for a carry-forward index.
    pub fn predecessor_chain(
        &self,
        previous: DateTime<Utc>,
        param: FwiParameter,
        run_type: RunType,
    ) -> PredecessorChain {
        PredecessorChain {
            calculated: self.calculated_index_key(previous, param, run_type),
            uploaded: self.uploaded_index_key(previous, param),
        }
    }

    /// Key of the most recent uploaded hourly FFMC raster preceding a
    /// model run start.
    ///
    /// Hourly FFMC uploads are named in operational time and exist for
    /// the hour one before the run start.
    pub fn uploaded_hourly_ffmc_key(&self, model_run_start: DateTime<Utc>) -> String {
        let op = to_operational_time(model_run_start) - Duration::hours(1);
        let date = op.date_naive();
        format!(
            "{}/{}/{}{}{:02}.tif",
            self.hourly_upload_prefix,
            date,
            FwiParameter::Ffmc.long_name(),
            compact_date(date),
            op.hour()
        )
    }

    /// Key of a calculated hourly FFMC raster (UTC-named).
    pub fn calculated_hourly_ffmc_key(&self, at: DateTime<Utc>) -> String {
        let date = at.date_naive();
        format!(
            "{}/hourlies/{}/{}{}{:02}.tif",
            self.calculated_prefix,
            date,
            FwiParameter::Ffmc.long_name(),
            compact_date(date),
            at.hour()
        )
    }

    /// Key of an interpolated weather surface, hierarchical by date.
    ///
    /// Example: `sfms/interpolated/temp/2024/01/15/temp_20240115.tif`.
    pub fn interpolated_key(&self, at: DateTime<Utc>, param: InterpolatedParameter) -> String {
        let date = at.date_naive();
        format!(
            "{}/{}/{:04}/{:02}/{:02}/{}_{}.tif",
            self.interpolated_prefix,
            param.key_name(),
            date.year(),
            date.month(),
            date.day(),
            param.key_name(),
            compact_date(date)
        )
    }

    /// Key of a decoded model weather raster at a prediction-hour offset
    /// from the model run most recently started before `start`.
    pub fn model_data_key(
        &self,
        start: DateTime<Utc>,
        prediction_hour: u32,
        param: WeatherParameter,
    ) -> String {
        let model_hour = model_run_for_hour(start.hour());
        let (variable, level_type, level) = model_key_params(param);
        format!(
            "{}/{}/{:02}/{}/CMC_reg_{}_{}_{}_ps10km_{}{:02}_P{:03}.tif",
            self.weather_model_prefix,
            start.date_naive(),
            model_hour,
            param.key_name(),
            variable,
            level_type,
            level,
            compact_date(start.date_naive()),
            model_hour,
            prediction_hour
        )
    }

    /// Key of the accumulated-precipitation raster computed upstream for
    /// the given target instant.
    pub fn computed_precip_key(&self, target: DateTime<Utc>) -> String {
        let model_hour = model_run_for_hour(target.hour());
        format!(
            "{}/{}/{:02}/precip/COMPUTED_reg_APCP_SFC_0_ps10km_{}_{:02}z.tif",
            self.weather_model_prefix,
            target.date_naive(),
            model_hour,
            compact_date(target.date_naive()),
            target.hour()
        )
    }

    /// All model weather keys feeding a daily calculation.
    pub fn weather_data_keys(
        &self,
        start: DateTime<Utc>,
        target: DateTime<Utc>,
        prediction_hour: u32,
    ) -> WeatherKeys {
        WeatherKeys {
            temp: self.model_data_key(start, prediction_hour, WeatherParameter::Temp),
            rh: self.model_data_key(start, prediction_hour, WeatherParameter::Rh),
            wind_speed: self.model_data_key(start, prediction_hour, WeatherParameter::WindSpeed),
            precip: self.computed_precip_key(target),
        }
    }

    /// All interpolated-surface keys feeding a daily actual calculation.
    pub fn interpolated_weather_keys(&self, target: DateTime<Utc>) -> WeatherKeys {
        WeatherKeys {
            temp: self.interpolated_key(target, InterpolatedParameter::Temp),
            rh: self.interpolated_key(target, InterpolatedParameter::Rh),
            wind_speed: self.interpolated_key(target, InterpolatedParameter::WindSpeed),
            precip: self.interpolated_key(target, InterpolatedParameter::Precip),
        }
    }

    /// Model weather keys for one hour of the hourly FFMC pipeline.
    pub fn weather_data_keys_hourly(
        &self,
        model_run_start: DateTime<Utc>,
        offset_hour: u32,
    ) -> WeatherKeys {
        let target = model_run_start + Duration::hours(i64::from(offset_hour));
        WeatherKeys {
            temp: self.model_data_key(model_run_start, offset_hour, WeatherParameter::Temp),
            rh: self.model_data_key(model_run_start, offset_hour, WeatherParameter::Rh),
            wind_speed: self.model_data_key(
                model_run_start,
                offset_hour,
                WeatherParameter::WindSpeed,
            ),
            precip: self.computed_precip_key(target),
        }
    }

    /// Key of the static elevation model raster.
    pub fn dem_key(&self) -> String {
        format!("{}/bc_elevation.tif", self.static_prefix)
    }

    /// Key of the static province mask raster.
    pub fn mask_key(&self) -> String {
        format!("{}/bc_mask.tif", self.static_prefix)
    }

    /// Derive the tiled web companion key from an artifact key.
    pub fn companion_key(&self, key: &str) -> SfmsResult<String> {
        let stem = key.strip_suffix(".tif").ok_or_else(|| {
            SfmsError::InvalidKeyFormat(format!("expected .tif file path, got {}", key))
        })?;
        Ok(format!("{}_cog.tif", stem))
    }
}

fn model_key_params(param: WeatherParameter) -> (&'static str, &'static str, &'static str) {
    match param {
        WeatherParameter::Temp => ("TMP", "TGL", "2"),
        WeatherParameter::Rh => ("RH", "TGL", "2"),
        WeatherParameter::WindSpeed => ("WIND", "TGL", "10"),
    }
}
