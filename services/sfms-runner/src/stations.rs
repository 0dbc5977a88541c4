//! File-backed station source.
//!
//! Station acquisition is an external collaborator; the runner consumes
//! its output as a JSON document of samples.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use interpolation::source::StationFetcher;
use sfms_common::{SfmsError, SfmsResult, StationSample};

/// Reads station samples from a JSON file.
pub struct JsonStationSource {
    path: PathBuf,
}

impl JsonStationSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl StationFetcher for JsonStationSource {
    async fn daily_actuals(&self, _at: DateTime<Utc>) -> SfmsResult<Vec<StationSample>> {
        let raw = tokio::fs::read(&self.path).await.map_err(|e| {
            SfmsError::Config(format!("stations file {}: {}", self.path.display(), e))
        })?;
        let samples: Vec<StationSample> = serde_json::from_slice(&raw)?;
        Ok(samples)
    }
}
