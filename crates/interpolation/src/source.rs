//! Extraction of interpolation inputs from station samples.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sfms_common::{InterpolatedParameter, SfmsResult, StationSample};

use crate::humidity;
use crate::lapse;

/// External station observation feed, reduced to the one call the
/// interpolation jobs make. Acquisition itself lives outside this
/// system.
#[async_trait]
pub trait StationFetcher: Send + Sync {
    /// All stations' observations for the given day.
    async fn daily_actuals(&self, at: DateTime<Utc>) -> SfmsResult<Vec<StationSample>>;
}

/// Station positions and values ready for IDW.
#[derive(Debug, Clone, Default)]
pub struct StationArrays {
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
    pub values: Vec<f64>,
}

impl StationArrays {
    pub fn len(&self) -> usize {
        self.lats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lats.is_empty()
    }
}

/// Values for a directly interpolated parameter; stations missing the
/// observation are dropped.
pub fn plain_values(stations: &[StationSample], param: InterpolatedParameter) -> StationArrays {
    let mut arrays = StationArrays::default();
    for station in stations {
        if let Some(value) = station.value(param) {
            arrays.lats.push(station.lat);
            arrays.lons.push(station.lon);
            arrays.values.push(value);
        }
    }
    arrays
}

/// Sea-level temperature values; stations missing temperature or
/// elevation are dropped.
pub fn sea_level_temperatures(stations: &[StationSample], rate: f64) -> StationArrays {
    lapse_adjusted(stations, rate, |s| s.temperature)
}

/// Sea-level dew points derived through the Magnus formula; stations
/// missing temperature, humidity or elevation are dropped.
pub fn sea_level_dew_points(stations: &[StationSample], rate: f64) -> StationArrays {
    lapse_adjusted(stations, rate, |s| {
        match (s.temperature, s.relative_humidity) {
            (Some(t), Some(rh)) => Some(humidity::dew_point(t, rh)),
            _ => None,
        }
    })
}

fn lapse_adjusted<F>(stations: &[StationSample], rate: f64, extract: F) -> StationArrays
where
    F: Fn(&StationSample) -> Option<f64>,
{
    let mut arrays = StationArrays::default();
    for station in stations {
        let (Some(value), Some(elevation)) = (extract(station), station.elevation) else {
            continue;
        };
        arrays.lats.push(station.lat);
        arrays.lons.push(station.lon);
        arrays
            .values
            .push(lapse::normalize_to_sea_level(value, elevation, rate));
    }
    arrays
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lapse::LAPSE_RATE_C_PER_M;

    fn station(
        code: i64,
        elevation: Option<f64>,
        temperature: Option<f64>,
        relative_humidity: Option<f64>,
    ) -> StationSample {
        StationSample {
            code,
            lat: 49.0 + code as f64 * 0.1,
            lon: -123.0,
            elevation,
            temperature,
            relative_humidity,
            precipitation: Some(1.0),
            wind_speed: None,
            ffmc: None,
            dmc: None,
            dc: None,
        }
    }

    #[test]
    fn test_plain_values_drop_missing() {
        let stations = vec![
            station(0, None, Some(10.0), None),
            station(1, None, None, None),
        ];
        let arrays = plain_values(&stations, InterpolatedParameter::Temp);
        assert_eq!(arrays.len(), 1);
        assert_eq!(arrays.values, vec![10.0]);

        let precip = plain_values(&stations, InterpolatedParameter::Precip);
        assert_eq!(precip.len(), 2);
    }

    #[test]
    fn test_sea_level_temperatures_require_elevation() {
        let stations = vec![
            station(0, Some(1000.0), Some(10.0), None),
            station(1, None, Some(12.0), None),
        ];
        let arrays = sea_level_temperatures(&stations, LAPSE_RATE_C_PER_M);
        assert_eq!(arrays.len(), 1);
        assert!((arrays.values[0] - 16.5).abs() < 1e-9);
    }

    #[test]
    fn test_sea_level_dew_points_require_both_observations() {
        let stations = vec![
            station(0, Some(0.0), Some(20.0), Some(50.0)),
            station(1, Some(100.0), Some(20.0), None),
            station(2, Some(100.0), None, Some(50.0)),
        ];
        let arrays = sea_level_dew_points(&stations, LAPSE_RATE_C_PER_M);
        assert_eq!(arrays.len(), 1);
        // Dew point of 20 degC at 50% humidity is near 9.3 degC.
        assert!((arrays.values[0] - 9.3).abs() < 0.2, "got {}", arrays.values[0]);
    }
}
