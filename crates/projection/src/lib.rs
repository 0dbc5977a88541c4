//! Map projections used by the raster pipeline.
//!
//! Supports the three spatial reference systems the pipeline actually
//! encounters: geographic WGS84 (EPSG:4326), the province-wide Albers
//! equal-area grid (EPSG:3005), and web mercator (EPSG:3857) for the tiled
//! companion artifacts. All math is spherical; rasters produced and
//! consumed by this system use a consistent earth model end to end.

pub mod albers;
pub mod mercator;

pub use albers::AlbersEqualArea;
pub use mercator::WebMercator;

use serde::{Deserialize, Serialize};

/// A spatial reference system identified by EPSG code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpatialRef {
    /// Geographic WGS84 lat/lon (EPSG:4326), coordinates in degrees.
    Geographic,
    /// BC Albers equal-area conic (EPSG:3005), coordinates in meters.
    BcAlbers,
    /// Web mercator (EPSG:3857), coordinates in meters.
    WebMercator,
}

impl SpatialRef {
    /// Resolve an EPSG code to a supported spatial reference.
    pub fn from_epsg(code: u32) -> Option<Self> {
        match code {
            4326 => Some(SpatialRef::Geographic),
            3005 => Some(SpatialRef::BcAlbers),
            3857 => Some(SpatialRef::WebMercator),
            _ => None,
        }
    }

    pub fn epsg(&self) -> u32 {
        match self {
            SpatialRef::Geographic => 4326,
            SpatialRef::BcAlbers => 3005,
            SpatialRef::WebMercator => 3857,
        }
    }

    /// True for projected systems whose coordinates are linear (meters).
    pub fn is_projected(&self) -> bool {
        !matches!(self, SpatialRef::Geographic)
    }

    /// Projected (x, y) to geographic (lon, lat) in degrees.
    pub fn to_geographic(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            SpatialRef::Geographic => (x, y),
            SpatialRef::BcAlbers => AlbersEqualArea::bc_albers().inverse(x, y),
            SpatialRef::WebMercator => WebMercator::new().inverse(x, y),
        }
    }

    /// Geographic (lon, lat) in degrees to projected (x, y).
    pub fn from_geographic(&self, lon: f64, lat: f64) -> (f64, f64) {
        match self {
            SpatialRef::Geographic => (lon, lat),
            SpatialRef::BcAlbers => AlbersEqualArea::bc_albers().forward(lon, lat),
            SpatialRef::WebMercator => WebMercator::new().forward(lon, lat),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epsg_round_trip() {
        for code in [4326u32, 3005, 3857] {
            let srs = SpatialRef::from_epsg(code).unwrap();
            assert_eq!(srs.epsg(), code);
        }
        assert!(SpatialRef::from_epsg(32610).is_none());
    }

    #[test]
    fn test_geographic_is_identity() {
        let srs = SpatialRef::Geographic;
        assert_eq!(srs.to_geographic(-123.5, 49.25), (-123.5, 49.25));
        assert_eq!(srs.from_geographic(-123.5, 49.25), (-123.5, 49.25));
    }

    #[test]
    fn test_projected_round_trips() {
        for srs in [SpatialRef::BcAlbers, SpatialRef::WebMercator] {
            let (x, y) = srs.from_geographic(-122.75, 53.9);
            let (lon, lat) = srs.to_geographic(x, y);
            assert!((lon - -122.75).abs() < 1e-7, "{:?} lon {}", srs, lon);
            assert!((lat - 53.9).abs() < 1e-7, "{:?} lat {}", srs, lat);
        }
    }
}
