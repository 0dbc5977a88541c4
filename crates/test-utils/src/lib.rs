//! Shared test fixtures: deterministic rasters and station samples.

pub mod generators;

pub use generators::{
    province_grid, put_raster, raster_with, station_at, uniform_raster,
};
