//! Station-to-grid spatial interpolation.
//!
//! Inverse distance weighting over Haversine distances, with lapse-rate
//! elevation correction for temperature-like quantities and a Magnus
//! dew-point path for relative humidity.

pub mod coverage;
pub mod humidity;
pub mod idw;
pub mod lapse;
pub mod source;
pub mod surface;

pub use coverage::CoverageSummary;
pub use idw::{haversine_distance_m, IdwConfig};
pub use surface::SurfaceInterpolator;
