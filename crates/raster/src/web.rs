//! Web-optimized companion export.
//!
//! Daily forecast artifacts get a companion copy warped to web mercator
//! and stored with a tiled layout so map clients can range-read it.

use bytes::Bytes;
use projection::SpatialRef;
use sfms_common::{SfmsError, SfmsResult};

use crate::handle::RasterHandle;
use crate::resample::ResampleMethod;
use crate::transform::GeoTransform;

impl RasterHandle {
    /// Produce the tiled, web-mercator companion copy of this raster.
    ///
    /// The output keeps the source pixel count per axis; its extent is the
    /// source extent reprojected to EPSG:3857.
    pub fn export_web_tiled(&self) -> SfmsResult<Bytes> {
        let (min_x, min_y, max_x, max_y) = self.mercator_bounds()?;
        if !(max_x > min_x && max_y > min_y) {
            return Err(SfmsError::Projection(
                "degenerate web-mercator extent".to_string(),
            ));
        }

        let width = self.width();
        let height = self.height();
        let transform = GeoTransform::north_up(
            min_x,
            max_y,
            (max_x - min_x) / width as f64,
            (max_y - min_y) / height as f64,
        );

        let warped = self.warp_to_grid(
            transform,
            SpatialRef::WebMercator,
            width,
            height,
            ResampleMethod::Bilinear,
            None,
        )?;

        let bytes = warped
            .to_image_for_web()
            .encode_tiled()
            .map_err(|e| SfmsError::raster_io(e.to_string()))?;
        Ok(Bytes::from(bytes))
    }

    /// Web-mercator extent of this raster, from its corner coordinates.
    fn mercator_bounds(&self) -> SfmsResult<(f64, f64, f64, f64)> {
        let gt = self.geo_transform();
        let corners = [
            gt.pixel_to_coord(0.0, 0.0),
            gt.pixel_to_coord(self.width() as f64, 0.0),
            gt.pixel_to_coord(0.0, self.height() as f64),
            gt.pixel_to_coord(self.width() as f64, self.height() as f64),
        ];

        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for (x, y) in corners {
            let (lon, lat) = self.spatial_ref().to_geographic(x, y);
            let (mx, my) = SpatialRef::WebMercator.from_geographic(lon, lat);
            min_x = min_x.min(mx);
            min_y = min_y.min(my);
            max_x = max_x.max(mx);
            max_y = max_y.max(my);
        }
        Ok((min_x, min_y, max_x, max_y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::NO_DATA_SENTINEL;

    #[test]
    fn test_companion_is_tiled_web_mercator() {
        let handle = RasterHandle::from_array(
            (0..64).map(|v| v as f32).collect(),
            8,
            8,
            GeoTransform::north_up(1_000_000.0, 900_000.0, 2000.0, 2000.0),
            SpatialRef::BcAlbers,
            Some(NO_DATA_SENTINEL),
        )
        .unwrap();

        let bytes = handle.export_web_tiled().unwrap();
        let companion = RasterHandle::from_bytes(&bytes).unwrap();
        assert_eq!(companion.spatial_ref(), SpatialRef::WebMercator);
        assert_eq!(companion.width(), 8);
        assert_eq!(companion.height(), 8);
        // Some interior cells survive the round trip with real values.
        assert!(companion
            .data()
            .iter()
            .any(|&v| v != NO_DATA_SENTINEL));
    }
}
