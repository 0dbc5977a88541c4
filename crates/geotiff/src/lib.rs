//! Single-band GeoTIFF codec (TIFF 6.0 subset + GeoTIFF 1.1 tags).
//!
//! This crate implements exactly the slice of the format the raster
//! pipeline produces and consumes: classic (non-Big) TIFF, one 32-bit
//! floating point band, strip or tile layout, no compression or deflate,
//! an axis-aligned geotransform expressed through the pixel-scale and
//! tiepoint tags, an EPSG code in the GeoKey directory, and the GDAL
//! no-data ASCII tag.
//!
//! Anything outside that subset is rejected as undecodable rather than
//! guessed at.

pub mod reader;
pub mod tags;
pub mod writer;

use thiserror::Error;

/// Errors raised while encoding or decoding GeoTIFF data.
#[derive(Debug, Error)]
pub enum TiffError {
    /// The buffer ended before a structure it promised.
    #[error("truncated TIFF data: {0}")]
    Truncated(String),

    /// Structurally invalid TIFF.
    #[error("invalid TIFF data: {0}")]
    InvalidFormat(String),

    /// Valid TIFF, but outside the supported subset.
    #[error("unsupported TIFF feature: {0}")]
    Unsupported(String),

    /// Compression or decompression failure.
    #[error("compression error: {0}")]
    Compression(String),
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, TiffError>;

/// Compression applied to strip/tile payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Deflate,
}

/// Physical arrangement of the raster payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Horizontal bands of `rows_per_strip` rows.
    Strips { rows_per_strip: usize },
    /// Square-ish tiles, edge tiles padded to full size.
    Tiles { tile_width: usize, tile_height: usize },
}

/// A decoded (or to-be-encoded) single-band floating point raster image.
#[derive(Debug, Clone)]
pub struct GeoTiff {
    /// Number of columns.
    pub width: usize,
    /// Number of rows.
    pub height: usize,
    /// Row-major cell values, `width * height` long.
    pub data: Vec<f32>,
    /// Affine geotransform: `x = gt[0] + col*gt[1]`, `y = gt[3] + row*gt[5]`
    /// (rotation terms `gt[2]`/`gt[4]` are always zero in this subset).
    pub geo_transform: [f64; 6],
    /// EPSG code of the spatial reference system.
    pub epsg: u32,
    /// Declared no-data sentinel, if any.
    pub nodata: Option<f32>,
}

impl GeoTiff {
    /// Encode with the default layout (deflate-compressed strips).
    pub fn encode(&self) -> Result<Vec<u8>> {
        writer::encode(self, Layout::Strips { rows_per_strip: 256 }, Compression::Deflate)
    }

    /// Encode as a web-friendly tiled raster.
    pub fn encode_tiled(&self) -> Result<Vec<u8>> {
        writer::encode(
            self,
            Layout::Tiles {
                tile_width: 256,
                tile_height: 256,
            },
            Compression::Deflate,
        )
    }

    /// Decode from raw bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        reader::decode(bytes)
    }
}
