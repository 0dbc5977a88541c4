//! Point observations from weather stations.

use serde::{Deserialize, Serialize};

use crate::parameter::InterpolatedParameter;

/// One station's observations for a single day.
///
/// Constructed fresh for each interpolation run from the external station
/// feed; never persisted by this system. Any individual quantity may be
/// missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationSample {
    /// Station identifier from the upstream network.
    pub code: i64,
    /// Latitude in decimal degrees (WGS84).
    pub lat: f64,
    /// Longitude in decimal degrees (WGS84).
    pub lon: f64,
    /// Station elevation in meters above sea level.
    pub elevation: Option<f64>,
    /// Air temperature in degrees Celsius.
    pub temperature: Option<f64>,
    /// Relative humidity in percent.
    pub relative_humidity: Option<f64>,
    /// 24-hour precipitation in millimeters.
    pub precipitation: Option<f64>,
    /// Wind speed in km/h.
    pub wind_speed: Option<f64>,
    /// Station-computed fine fuel moisture code.
    pub ffmc: Option<f64>,
    /// Station-computed duff moisture code.
    pub dmc: Option<f64>,
    /// Station-computed drought code.
    pub dc: Option<f64>,
}

impl StationSample {
    /// The observed value for an interpolated parameter, if present.
    ///
    /// Relative humidity is intentionally not exposed here: humidity
    /// surfaces are derived through the dew-point path, never interpolated
    /// directly.
    pub fn value(&self, param: InterpolatedParameter) -> Option<f64> {
        match param {
            InterpolatedParameter::Temp => self.temperature,
            InterpolatedParameter::Rh => None,
            InterpolatedParameter::WindSpeed => self.wind_speed,
            InterpolatedParameter::Precip => self.precipitation,
            InterpolatedParameter::Ffmc => self.ffmc,
            InterpolatedParameter::Dmc => self.dmc,
            InterpolatedParameter::Dc => self.dc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StationSample {
        StationSample {
            code: 331,
            lat: 49.5,
            lon: -123.2,
            elevation: Some(210.0),
            temperature: Some(18.5),
            relative_humidity: Some(40.0),
            precipitation: Some(0.2),
            wind_speed: None,
            ffmc: Some(88.0),
            dmc: None,
            dc: None,
        }
    }

    #[test]
    fn test_value_lookup() {
        let s = sample();
        assert_eq!(s.value(InterpolatedParameter::Temp), Some(18.5));
        assert_eq!(s.value(InterpolatedParameter::Precip), Some(0.2));
        assert_eq!(s.value(InterpolatedParameter::WindSpeed), None);
        assert_eq!(s.value(InterpolatedParameter::Ffmc), Some(88.0));
    }

    #[test]
    fn test_rh_is_never_direct() {
        // RH reaches the grid via dew point; direct lookup must be empty
        // even when the observation exists.
        let s = sample();
        assert!(s.relative_humidity.is_some());
        assert_eq!(s.value(InterpolatedParameter::Rh), None);
    }
}
