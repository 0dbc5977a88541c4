//! Runner configuration from the environment.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use storage::ObjectStorageConfig;

/// Configuration for one runner invocation.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub storage: ObjectStorageConfig,
    /// JSON document of station samples for interpolation runs.
    pub stations_file: Option<PathBuf>,
}

impl RunnerConfig {
    /// Load from the environment (a `.env` file is honored if present).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = ObjectStorageConfig::default();
        let storage = ObjectStorageConfig {
            endpoint: env_or("OBJECT_STORE_ENDPOINT", &defaults.endpoint),
            bucket: env_or("OBJECT_STORE_BUCKET", &defaults.bucket),
            access_key_id: env::var("OBJECT_STORE_ACCESS_KEY")
                .context("OBJECT_STORE_ACCESS_KEY is required")?,
            secret_access_key: env::var("OBJECT_STORE_SECRET")
                .context("OBJECT_STORE_SECRET is required")?,
            region: env_or("OBJECT_STORE_REGION", &defaults.region),
            allow_http: env_or("OBJECT_STORE_ALLOW_HTTP", "true") == "true",
        };

        Ok(Self {
            storage,
            stations_file: env::var("STATIONS_FILE").ok().map(PathBuf::from),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
