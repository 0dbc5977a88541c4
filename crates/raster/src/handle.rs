//! The raster handle: one grid, exclusively owned.

use std::path::Path;

use bytes::Bytes;
use geotiff::GeoTiff;
use projection::SpatialRef;
use sfms_common::{SfmsError, SfmsResult};
use tracing::debug;

use crate::resample::{sample, ResampleMethod};
use crate::tiles::TileWindows;
use crate::transform::GeoTransform;

/// Sentinel written when a raster has no inherited no-data value.
pub const NO_DATA_SENTINEL: f32 = -9999.0;

/// Geographic coordinates of one valid cell, with its grid position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellCoord {
    pub lat: f64,
    pub lon: f64,
    pub row: usize,
    pub col: usize,
}

/// A single-band raster with its georeferencing.
///
/// The handle exclusively owns its buffer; dropping it releases the
/// memory immediately and no two handles ever alias one grid. Handles are
/// not synchronized - wrap one externally before sharing across threads.
#[derive(Debug, Clone)]
pub struct RasterHandle {
    data: Vec<f32>,
    width: usize,
    height: usize,
    transform: GeoTransform,
    srs: SpatialRef,
    nodata: Option<f32>,
}

impl RasterHandle {
    /// Open a raster from a file on disk.
    pub fn open(path: &Path) -> SfmsResult<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| SfmsError::raster_io(format!("{}: {}", path.display(), e)))?;
        Self::from_bytes(&bytes)
    }

    /// Decode a raster from bytes (e.g. an object fetched from storage).
    pub fn from_bytes(bytes: &[u8]) -> SfmsResult<Self> {
        let image = GeoTiff::decode(bytes).map_err(|e| SfmsError::raster_io(e.to_string()))?;
        let srs = SpatialRef::from_epsg(image.epsg).ok_or_else(|| {
            SfmsError::Projection(format!("unsupported EPSG code {}", image.epsg))
        })?;
        Self::from_array(
            image.data,
            image.width,
            image.height,
            GeoTransform(image.geo_transform),
            srs,
            image.nodata,
        )
    }

    /// Build a handle from an in-memory grid.
    pub fn from_array(
        data: Vec<f32>,
        width: usize,
        height: usize,
        transform: GeoTransform,
        srs: SpatialRef,
        nodata: Option<f32>,
    ) -> SfmsResult<Self> {
        if data.len() != width * height {
            return Err(SfmsError::raster_io(format!(
                "grid length {} does not match {}x{}",
                data.len(),
                width,
                height
            )));
        }
        if !transform.is_axis_aligned() {
            return Err(SfmsError::raster_io(
                "rotated geotransforms are not supported".to_string(),
            ));
        }
        Ok(Self {
            data,
            width,
            height,
            transform,
            srs,
            nodata,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn geo_transform(&self) -> GeoTransform {
        self.transform
    }

    pub fn spatial_ref(&self) -> SpatialRef {
        self.srs
    }

    pub fn nodata(&self) -> Option<f32> {
        self.nodata
    }

    /// Borrow the row-major cell values.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Consume the handle, returning the buffer and its old sentinel.
    pub fn into_array(self) -> (Vec<f32>, Option<f32>) {
        (self.data, self.nodata)
    }

    /// Value at a grid position; None outside the grid.
    pub fn value_at(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        Some(self.data[row * self.width + col])
    }

    /// True when a value equals the no-data sentinel.
    pub fn is_nodata(&self, value: f32) -> bool {
        match self.nodata {
            Some(sentinel) => value == sentinel || value.is_nan(),
            None => value.is_nan(),
        }
    }

    /// Boolean no-data mask and the sentinel, when one is declared.
    pub fn nodata_mask(&self) -> Option<(Vec<bool>, f32)> {
        let sentinel = self.nodata?;
        let mask = self.data.iter().map(|&v| v == sentinel).collect();
        Some((mask, sentinel))
    }

    /// Copy of the grid with the sentinel replaced, plus the old sentinel.
    pub fn replace_nodata(&self, value: f32) -> (Vec<f32>, Option<f32>) {
        match self.nodata {
            Some(sentinel) => (
                self.data
                    .iter()
                    .map(|&v| if v == sentinel { value } else { v })
                    .collect(),
                Some(sentinel),
            ),
            None => (self.data.clone(), None),
        }
    }

    /// Warp this raster onto the reference's grid.
    ///
    /// The output geotransform, spatial reference and dimensions are
    /// exactly the reference's. `clamp_max` bounds resampled values, used
    /// for percentage quantities where interpolation can overshoot.
    pub fn warp_to_match(
        &self,
        reference: &RasterHandle,
        method: ResampleMethod,
        clamp_max: Option<f32>,
    ) -> SfmsResult<RasterHandle> {
        self.warp_to_grid(
            reference.transform,
            reference.srs,
            reference.width,
            reference.height,
            method,
            clamp_max,
        )
    }

    /// Warp onto an arbitrary target grid.
    pub(crate) fn warp_to_grid(
        &self,
        target_transform: GeoTransform,
        target_srs: SpatialRef,
        target_width: usize,
        target_height: usize,
        method: ResampleMethod,
        clamp_max: Option<f32>,
    ) -> SfmsResult<RasterHandle> {
        let sentinel = self.nodata.unwrap_or(NO_DATA_SENTINEL);

        // NaN-mask the source so kernels propagate no-data.
        let masked: Vec<f32> = match self.nodata {
            Some(nd) => self
                .data
                .iter()
                .map(|&v| if v == nd { f32::NAN } else { v })
                .collect(),
            None => self.data.clone(),
        };

        let same_srs = target_srs == self.srs;
        let mut out = vec![sentinel; target_width * target_height];
        for row in 0..target_height {
            for col in 0..target_width {
                let (tx, ty) = target_transform.pixel_center(col, row);
                let (sx, sy) = if same_srs {
                    (tx, ty)
                } else {
                    let (lon, lat) = target_srs.to_geographic(tx, ty);
                    self.srs.from_geographic(lon, lat)
                };
                let (pc, pr) = self.transform.coord_to_pixel(sx, sy);
                // Shift into pixel-center space for the kernels.
                let v = sample(&masked, self.width, self.height, pc - 0.5, pr - 0.5, method);
                if v.is_finite() {
                    let v = match clamp_max {
                        Some(max) => v.min(max),
                        None => v,
                    };
                    out[row * target_width + col] = v;
                }
            }
        }

        debug!(
            src = ?(self.width, self.height),
            dst = ?(target_width, target_height),
            ?method,
            "warped raster"
        );

        RasterHandle::from_array(
            out,
            target_width,
            target_height,
            target_transform,
            target_srs,
            Some(sentinel),
        )
    }

    /// Verify two rasters share a grid exactly; error otherwise.
    fn check_geometry(&self, other: &RasterHandle) -> SfmsResult<()> {
        if self.width != other.width || self.height != other.height {
            return Err(SfmsError::DimensionMismatch {
                expected: format!("{}x{}", self.width, self.height),
                actual: format!("{}x{}", other.width, other.height),
            });
        }
        if self.srs != other.srs {
            return Err(SfmsError::ProjectionMismatch {
                expected: self.srs.epsg(),
                actual: other.srs.epsg(),
            });
        }
        let (ex, ey) = self.transform.origin();
        let (ax, ay) = other.transform.origin();
        if ex != ax || ey != ay {
            return Err(SfmsError::OriginMismatch {
                expected_x: ex,
                expected_y: ey,
                actual_x: ax,
                actual_y: ay,
            });
        }
        Ok(())
    }

    /// Element-wise product with `other` binarized (>= 1 becomes 1, else 0).
    ///
    /// Both rasters must already share the grid exactly; mismatches are a
    /// defect and fail rather than being silently corrected. The grid is
    /// processed window by window to bound peak memory.
    pub fn masked_multiply(&self, other: &RasterHandle) -> SfmsResult<RasterHandle> {
        self.check_geometry(other)?;

        let mut out = vec![0.0f32; self.width * self.height];
        for window in TileWindows::new(self.width, self.height) {
            for row in window.y..window.y + window.height {
                for col in window.x..window.x + window.width {
                    let i = row * self.width + col;
                    let a = self.data[i];
                    if self.is_nodata(a) {
                        out[i] = self.nodata.unwrap_or(NO_DATA_SENTINEL);
                        continue;
                    }
                    let factor = if other.data[i] >= 1.0 { 1.0 } else { 0.0 };
                    out[i] = a * factor;
                }
            }
        }

        RasterHandle::from_array(
            out,
            self.width,
            self.height,
            self.transform,
            self.srs,
            Some(self.nodata.unwrap_or(NO_DATA_SENTINEL)),
        )
    }

    /// Valid-cell mask from a mask raster (non-zero and not no-data).
    ///
    /// The mask is first warped onto this raster's grid with nearest
    /// resampling, so any mask source grid is accepted.
    pub fn apply_mask(&self, mask: &RasterHandle) -> SfmsResult<Vec<bool>> {
        let warped = mask.warp_to_match(self, ResampleMethod::Nearest, None)?;
        Ok(warped
            .data
            .iter()
            .map(|&v| v != 0.0 && !warped.is_nodata(v))
            .collect())
    }

    /// Geographic coordinates (pixel centers) of valid cells.
    ///
    /// With no mask supplied, cells carrying the no-data sentinel are
    /// skipped; without a sentinel every cell is reported. This is the
    /// bridge from grid space to the station interpolation engine.
    pub fn lat_lon_coords(&self, mask: Option<&[bool]>) -> SfmsResult<Vec<CellCoord>> {
        if let Some(m) = mask {
            if m.len() != self.data.len() {
                return Err(SfmsError::DimensionMismatch {
                    expected: format!("{}", self.data.len()),
                    actual: format!("{}", m.len()),
                });
            }
        }

        let mut coords = Vec::new();
        for row in 0..self.height {
            for col in 0..self.width {
                let i = row * self.width + col;
                let valid = match mask {
                    Some(m) => m[i],
                    None => !self.is_nodata(self.data[i]),
                };
                if !valid {
                    continue;
                }
                let (x, y) = self.transform.pixel_center(col, row);
                let (lon, lat) = self.srs.to_geographic(x, y);
                coords.push(CellCoord { lat, lon, row, col });
            }
        }
        Ok(coords)
    }

    /// Encode to GeoTIFF bytes, preserving georeferencing and no-data.
    pub fn export(&self) -> SfmsResult<Bytes> {
        let image = self.to_image();
        let bytes = image
            .encode()
            .map_err(|e| SfmsError::raster_io(e.to_string()))?;
        Ok(Bytes::from(bytes))
    }

    /// Write a GeoTIFF file at the given path.
    pub fn export_to_path(&self, path: &Path) -> SfmsResult<()> {
        let bytes = self.export()?;
        std::fs::write(path, &bytes)
            .map_err(|e| SfmsError::raster_io(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }

    fn to_image(&self) -> GeoTiff {
        GeoTiff {
            width: self.width,
            height: self.height,
            data: self.data.clone(),
            geo_transform: self.transform.0,
            epsg: self.srs.epsg(),
            nodata: self.nodata,
        }
    }

    pub(crate) fn to_image_for_web(&self) -> GeoTiff {
        self.to_image()
    }
}
