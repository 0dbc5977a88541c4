//! Raster handles: the algebra layer every pipeline stage computes on.
//!
//! A [`RasterHandle`] owns one single-band grid together with its affine
//! geotransform, spatial reference and no-data sentinel. Handles never
//! share buffers; dropping a handle releases its memory immediately.

pub mod handle;
pub mod resample;
pub mod tiles;
pub mod transform;
mod web;

pub use handle::{CellCoord, RasterHandle, NO_DATA_SENTINEL};
pub use resample::ResampleMethod;
pub use tiles::{TileWindow, TileWindows};
pub use transform::GeoTransform;
