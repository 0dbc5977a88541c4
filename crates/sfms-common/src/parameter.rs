//! Weather and fire-weather-index parameter enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// Production cadence of a parameter or pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cadence {
    Daily,
    Hourly,
}

/// Weather parameters delivered by the numerical weather model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeatherParameter {
    Temp,
    Rh,
    WindSpeed,
}

impl WeatherParameter {
    /// All model weather parameters, in key-composition order.
    pub const ALL: [WeatherParameter; 3] = [
        WeatherParameter::Temp,
        WeatherParameter::Rh,
        WeatherParameter::WindSpeed,
    ];

    /// Short name used in storage keys.
    pub fn key_name(&self) -> &'static str {
        match self {
            WeatherParameter::Temp => "temp",
            WeatherParameter::Rh => "rh",
            WeatherParameter::WindSpeed => "wind_speed",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            WeatherParameter::Temp => "degC",
            WeatherParameter::Rh => "%",
            WeatherParameter::WindSpeed => "km/h",
        }
    }

    /// Plausible physical range used for input sanity checks.
    pub fn sanity_range(&self) -> RangeInclusive<f64> {
        match self {
            WeatherParameter::Temp => -60.0..=60.0,
            WeatherParameter::Rh => 0.0..=100.0,
            WeatherParameter::WindSpeed => 0.0..=250.0,
        }
    }
}

impl fmt::Display for WeatherParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key_name())
    }
}

/// Fire Weather Index System parameters produced by the calculation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FwiParameter {
    Dc,
    Dmc,
    Bui,
    Ffmc,
    Isi,
    Fwi,
}

impl FwiParameter {
    /// Short name used in storage keys.
    pub fn key_name(&self) -> &'static str {
        match self {
            FwiParameter::Dc => "dc",
            FwiParameter::Dmc => "dmc",
            FwiParameter::Bui => "bui",
            FwiParameter::Ffmc => "ffmc",
            FwiParameter::Isi => "isi",
            FwiParameter::Fwi => "fwi",
        }
    }

    /// Long name used in hourly storage keys.
    pub fn long_name(&self) -> &'static str {
        match self {
            FwiParameter::Dc => "drought_code",
            FwiParameter::Dmc => "duff_moisture_code",
            FwiParameter::Bui => "build_up_index",
            FwiParameter::Ffmc => "fine_fuel_moisture_code",
            FwiParameter::Isi => "initial_spread_index",
            FwiParameter::Fwi => "fire_weather_index",
        }
    }

    /// The indices carried forward day to day (yesterday's value feeds today's).
    pub fn is_carry_forward(&self) -> bool {
        matches!(
            self,
            FwiParameter::Dc | FwiParameter::Dmc | FwiParameter::Ffmc
        )
    }

    pub fn cadence(&self) -> Cadence {
        Cadence::Daily
    }

    /// Plausible output range used for sanity checks; never used to clamp.
    pub fn sanity_range(&self) -> RangeInclusive<f64> {
        match self {
            FwiParameter::Ffmc => 0.0..=101.0,
            FwiParameter::Dmc => 0.0..=1000.0,
            FwiParameter::Dc => 0.0..=1500.0,
            FwiParameter::Bui => 0.0..=1000.0,
            FwiParameter::Isi => 0.0..=300.0,
            FwiParameter::Fwi => 0.0..=300.0,
        }
    }
}

impl fmt::Display for FwiParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key_name())
    }
}

/// Parameters the station interpolation engine produces surfaces for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterpolatedParameter {
    Temp,
    Rh,
    WindSpeed,
    Precip,
    Ffmc,
    Dmc,
    Dc,
}

impl InterpolatedParameter {
    /// Short name used in storage keys.
    pub fn key_name(&self) -> &'static str {
        match self {
            InterpolatedParameter::Temp => "temp",
            InterpolatedParameter::Rh => "rh",
            InterpolatedParameter::WindSpeed => "wind_speed",
            InterpolatedParameter::Precip => "precip",
            InterpolatedParameter::Ffmc => "ffmc",
            InterpolatedParameter::Dmc => "dmc",
            InterpolatedParameter::Dc => "dc",
        }
    }

    /// Whether values are shifted to sea level before interpolation.
    ///
    /// Only temperature-like quantities follow a lapse rate; moisture codes
    /// and precipitation are interpolated as observed. Humidity reaches the
    /// grid through the dew-point path, which is lapse-adjusted.
    pub fn is_lapse_adjusted(&self) -> bool {
        matches!(self, InterpolatedParameter::Temp | InterpolatedParameter::Rh)
    }
}

impl fmt::Display for InterpolatedParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key_name())
    }
}
