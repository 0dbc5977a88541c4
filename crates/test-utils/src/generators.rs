//! Test data generators for predictable raster and station fixtures.

use projection::SpatialRef;
use raster::{GeoTransform, RasterHandle, NO_DATA_SENTINEL};
use sfms_common::{SfmsResult, StationSample};
use storage::ObjectStorage;

/// The standard small test grid: a 2 km Albers grid in the middle of the
/// province.
///
/// Every fixture raster shares this geometry so stage inputs align
/// without warping surprises.
pub fn province_grid() -> (GeoTransform, SpatialRef) {
    (
        GeoTransform::north_up(1_000_000.0, 900_000.0, 2000.0, 2000.0),
        SpatialRef::BcAlbers,
    )
}

/// A raster on the standard grid filled with one value.
pub fn uniform_raster(width: usize, height: usize, value: f32) -> RasterHandle {
    raster_with(vec![value; width * height], width, height)
}

/// A raster on the standard grid from explicit row-major values.
pub fn raster_with(values: Vec<f32>, width: usize, height: usize) -> RasterHandle {
    let (transform, srs) = province_grid();
    RasterHandle::from_array(values, width, height, transform, srs, Some(NO_DATA_SENTINEL))
        .expect("fixture dimensions are consistent")
}

/// Encode a raster and store it at the given key.
pub async fn put_raster(
    storage: &ObjectStorage,
    key: &str,
    raster: &RasterHandle,
) -> SfmsResult<()> {
    let bytes = raster.export()?;
    storage.put(key, bytes).await
}

/// A station sample with full weather observations.
pub fn station_at(code: i64, lat: f64, lon: f64, elevation: f64) -> StationSample {
    StationSample {
        code,
        lat,
        lon,
        elevation: Some(elevation),
        temperature: Some(18.0),
        relative_humidity: Some(55.0),
        precipitation: Some(0.0),
        wind_speed: Some(10.0),
        ffmc: Some(85.0),
        dmc: Some(30.0),
        dc: Some(200.0),
    }
}
