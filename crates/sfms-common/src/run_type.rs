//! Run type of a calculation: model-grid driven vs station-interpolated.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SfmsError;

/// Distinguishes model-grid-driven runs from station-interpolated runs.
///
/// Calculated artifact keys are namespaced by run type so the two families
/// never collide for the same parameter and date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunType {
    Forecast,
    Actual,
}

impl RunType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunType::Forecast => "forecast",
            RunType::Actual => "actual",
        }
    }
}

impl fmt::Display for RunType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunType {
    type Err = SfmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forecast" => Ok(RunType::Forecast),
            "actual" => Ok(RunType::Actual),
            other => Err(SfmsError::Config(format!("unknown run type: {}", other))),
        }
    }
}
