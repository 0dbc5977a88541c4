//! Error types for sfms-rasters services.

use thiserror::Error;

/// Result type alias using SfmsError.
pub type SfmsResult<T> = Result<T, SfmsError>;

/// Primary error type for raster pipeline operations.
#[derive(Debug, Error)]
pub enum SfmsError {
    // === Availability errors (recoverable: retry on a later run) ===
    #[error("Required input not yet available: {0}")]
    MissingInput(String),

    // === Raster geometry errors (always a defect, never corrected silently) ===
    #[error("Raster dimensions do not match: {expected} vs {actual}")]
    DimensionMismatch { expected: String, actual: String },

    #[error("Raster projections do not match: EPSG:{expected} vs EPSG:{actual}")]
    ProjectionMismatch { expected: u32, actual: u32 },

    #[error("Raster origins do not match: ({expected_x}, {expected_y}) vs ({actual_x}, {actual_y})")]
    OriginMismatch {
        expected_x: f64,
        expected_y: f64,
        actual_x: f64,
        actual_y: f64,
    },

    // === Data errors ===
    #[error("Failed to decode raster: {0}")]
    RasterIo(String),

    #[error("Invalid artifact key: {0}")]
    InvalidKeyFormat(String),

    #[error("Projection error: {0}")]
    Projection(String),

    #[error("Interpolation error: {0}")]
    Interpolation(String),

    // === Infrastructure errors ===
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SfmsError {
    /// Create a MissingInput error.
    pub fn missing_input(key: impl Into<String>) -> Self {
        Self::MissingInput(key.into())
    }

    /// Create a RasterIo error.
    pub fn raster_io(msg: impl Into<String>) -> Self {
        Self::RasterIo(msg.into())
    }

    /// Create a Storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// True when a later run may succeed without any code or data fix.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SfmsError::MissingInput(_))
    }
}

impl From<std::io::Error> for SfmsError {
    fn from(err: std::io::Error) -> Self {
        SfmsError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for SfmsError {
    fn from(err: serde_json::Error) -> Self {
        SfmsError::Config(format!("JSON error: {}", err))
    }
}
