//! Per-cell application of index formulas over raster grids.

use raster::{RasterHandle, NO_DATA_SENTINEL};
use sfms_common::{SfmsError, SfmsResult};

/// Apply a per-cell function across aligned input rasters.
///
/// All inputs must share the first raster's grid exactly (the engine
/// warps them beforehand; a mismatch here is a defect). Any no-data
/// input cell forces the no-data sentinel in the output - formulas never
/// see sentinels.
pub fn apply_cellwise<F>(inputs: &[&RasterHandle], f: F) -> SfmsResult<RasterHandle>
where
    F: Fn(&[f64]) -> f64,
{
    let first = inputs.first().ok_or_else(|| {
        SfmsError::raster_io("cellwise application requires at least one input")
    })?;

    for other in &inputs[1..] {
        check_alignment(first, other)?;
    }

    let len = first.data().len();
    let mut out = vec![NO_DATA_SENTINEL; len];
    let mut cell_values = vec![0.0f64; inputs.len()];

    'cells: for i in 0..len {
        for (slot, raster) in cell_values.iter_mut().zip(inputs.iter()) {
            let v = raster.data()[i];
            if raster.is_nodata(v) {
                continue 'cells;
            }
            *slot = f64::from(v);
        }
        out[i] = f(&cell_values) as f32;
    }

    RasterHandle::from_array(
        out,
        first.width(),
        first.height(),
        first.geo_transform(),
        first.spatial_ref(),
        Some(NO_DATA_SENTINEL),
    )
}

fn check_alignment(reference: &RasterHandle, other: &RasterHandle) -> SfmsResult<()> {
    if reference.width() != other.width() || reference.height() != other.height() {
        return Err(SfmsError::DimensionMismatch {
            expected: format!("{}x{}", reference.width(), reference.height()),
            actual: format!("{}x{}", other.width(), other.height()),
        });
    }
    if reference.spatial_ref() != other.spatial_ref() {
        return Err(SfmsError::ProjectionMismatch {
            expected: reference.spatial_ref().epsg(),
            actual: other.spatial_ref().epsg(),
        });
    }
    let (ex, ey) = reference.geo_transform().origin();
    let (ax, ay) = other.geo_transform().origin();
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

/// Per-cell latitudes of a raster's pixel centers, row-major.
pub fn latitude_grid(reference: &RasterHandle) -> Vec<f64> {
    let gt = reference.geo_transform();
    let srs = reference.spatial_ref();
    let mut latitudes = Vec::with_capacity(reference.width() * reference.height());
    for row in 0..reference.height() {
        for col in 0..reference.width() {
            let (x, y) = gt.pixel_center(col, row);
            let (_, lat) = srs.to_geographic(x, y);
            latitudes.push(lat);
        }
    }
    latitudes
}

#[cfg(test)]
mod tests {
    use super::*;
    use projection::SpatialRef;
    use raster::GeoTransform;

    fn handle(data: Vec<f32>) -> RasterHandle {
        RasterHandle::from_array(
            data,
            2,
            2,
            GeoTransform::north_up(1_000_000.0, 900_000.0, 2000.0, 2000.0),
            SpatialRef::BcAlbers,
            Some(NO_DATA_SENTINEL),
        )
        .unwrap()
    }

    #[test]
    fn test_apply_sums_cells() {
        let a = handle(vec![1.0, 2.0, 3.0, 4.0]);
        let b = handle(vec![10.0, 20.0, 30.0, 40.0]);
        let out = apply_cellwise(&[&a, &b], |v| v[0] + v[1]).unwrap();
        assert_eq!(out.data(), &[11.0, 22.0, 33.0, 44.0]);
    }

    #[test]
    fn test_nodata_in_any_input_propagates() {
        let a = handle(vec![1.0, NO_DATA_SENTINEL, 3.0, 4.0]);
        let b = handle(vec![10.0, 20.0, NO_DATA_SENTINEL, 40.0]);
        let out = apply_cellwise(&[&a, &b], |v| v[0] + v[1]).unwrap();
        assert_eq!(out.data()[0], 11.0);
        assert_eq!(out.data()[1], NO_DATA_SENTINEL);
        assert_eq!(out.data()[2], NO_DATA_SENTINEL);
        assert_eq!(out.data()[3], 44.0);
    }

    #[test]
    fn test_misaligned_inputs_fail() {
        let a = handle(vec![1.0; 4]);
        let b = RasterHandle::from_array(
            vec![1.0; 4],
            2,
            2,
            GeoTransform::north_up(1_000_000.0, 902_000.0, 2000.0, 2000.0),
            SpatialRef::BcAlbers,
            None,
        )
        .unwrap();
        assert!(apply_cellwise(&[&a, &b], |v| v[0]).is_err());
    }

    #[test]
    fn test_latitude_grid_descends_southward() {
        let a = handle(vec![0.0; 4]);
        let lats = latitude_grid(&a);
        assert_eq!(lats.len(), 4);
        // Row 0 is further north than row 1.
        assert!(lats[0] > lats[2]);
        assert!(lats[1] > lats[3]);
    }
}
