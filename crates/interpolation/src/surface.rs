//! Building gridded surfaces from station observations.

use raster::{CellCoord, RasterHandle, ResampleMethod, NO_DATA_SENTINEL};
use sfms_common::{InterpolatedParameter, SfmsResult, StationSample};
use tracing::{info, warn};

use crate::coverage::CoverageSummary;
use crate::humidity;
use crate::idw::{idw_at, IdwConfig};
use crate::lapse::{denormalize_from_sea_level, LAPSE_RATE_C_PER_M};
use crate::source::{self, StationArrays};

/// Builds interpolated weather surfaces on a reference grid.
pub struct SurfaceInterpolator {
    pub idw: IdwConfig,
    pub lapse_rate: f64,
}

impl Default for SurfaceInterpolator {
    fn default() -> Self {
        Self {
            idw: IdwConfig::default(),
            lapse_rate: LAPSE_RATE_C_PER_M,
        }
    }
}

impl SurfaceInterpolator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interpolate a parameter with no elevation dependence
    /// (precipitation, wind, moisture codes).
    pub fn plain_surface(
        &self,
        param: InterpolatedParameter,
        stations: &[StationSample],
        reference: &RasterHandle,
        mask: Option<&RasterHandle>,
    ) -> SfmsResult<(RasterHandle, CoverageSummary)> {
        let arrays = source::plain_values(stations, param);
        info!(
            param = %param,
            stations = arrays.len(),
            "interpolating surface"
        );
        self.interpolate(&arrays, reference, mask, None)
    }

    /// Interpolate temperature with lapse-rate elevation correction.
    ///
    /// The DEM may be on any grid; it is warped onto the reference grid
    /// before cell elevations are read.
    pub fn temperature_surface(
        &self,
        stations: &[StationSample],
        reference: &RasterHandle,
        dem: &RasterHandle,
        mask: Option<&RasterHandle>,
    ) -> SfmsResult<(RasterHandle, CoverageSummary)> {
        let arrays = source::sea_level_temperatures(stations, self.lapse_rate);
        info!(stations = arrays.len(), "interpolating temperature surface");
        let dem_on_ref = dem.warp_to_match(reference, ResampleMethod::Bilinear, None)?;
        self.interpolate(&arrays, reference, mask, Some(&dem_on_ref))
    }

    /// Derive the relative humidity surface from station dew points and
    /// the already-interpolated temperature surface.
    ///
    /// Dew points are lapse-adjusted and interpolated exactly like
    /// temperature, then combined cell by cell through the inverse
    /// Magnus formula, clamped to [0, 100].
    pub fn humidity_surface(
        &self,
        stations: &[StationSample],
        temperature: &RasterHandle,
        dem: &RasterHandle,
        mask: Option<&RasterHandle>,
    ) -> SfmsResult<(RasterHandle, CoverageSummary)> {
        let arrays = source::sea_level_dew_points(stations, self.lapse_rate);
        info!(stations = arrays.len(), "interpolating dew point surface");
        let dem_on_ref = dem.warp_to_match(temperature, ResampleMethod::Bilinear, None)?;
        let (dew_surface, mut summary) =
            self.interpolate(&arrays, temperature, mask, Some(&dem_on_ref))?;

        let mut values = vec![NO_DATA_SENTINEL; temperature.data().len()];
        let mut combined = 0usize;
        for i in 0..values.len() {
            let t = temperature.data()[i];
            let dew = dew_surface.data()[i];
            if temperature.is_nodata(t) || dew_surface.is_nodata(dew) {
                continue;
            }
            values[i] = humidity::relative_humidity(f64::from(t), f64::from(dew)) as f32;
            combined += 1;
        }
        // Humidity exists only where both surfaces resolved.
        summary.interpolated = combined;

        let surface = RasterHandle::from_array(
            values,
            temperature.width(),
            temperature.height(),
            temperature.geo_transform(),
            temperature.spatial_ref(),
            Some(NO_DATA_SENTINEL),
        )?;
        Ok((surface, summary))
    }

    /// Core normalize-interpolate-denormalize walk over the grid.
    fn interpolate(
        &self,
        arrays: &StationArrays,
        reference: &RasterHandle,
        mask: Option<&RasterHandle>,
        dem_on_ref: Option<&RasterHandle>,
    ) -> SfmsResult<(RasterHandle, CoverageSummary)> {
        let total_cells = reference.width() * reference.height();

        let valid = match mask {
            Some(mask_raster) => Some(reference.apply_mask(mask_raster)?),
            None => None,
        };
        let cells: Vec<CellCoord> = match &valid {
            Some(v) => reference.lat_lon_coords(Some(v))?,
            None => {
                // Without a mask every cell is a candidate, including ones
                // currently holding the sentinel in the reference raster.
                let all = vec![true; total_cells];
                reference.lat_lon_coords(Some(&all))?
            }
        };

        let mut summary = CoverageSummary {
            total_cells,
            masked_out: total_cells - cells.len(),
            ..Default::default()
        };

        let mut values = vec![NO_DATA_SENTINEL; total_cells];
        for cell in &cells {
            let index = cell.row * reference.width() + cell.col;

            let elevation = match dem_on_ref {
                Some(dem) => {
                    let v = dem.data()[index];
                    if dem.is_nodata(v) {
                        summary.missing_terrain_data += 1;
                        continue;
                    }
                    Some(f64::from(v))
                }
                None => None,
            };

            match idw_at(
                &self.idw,
                cell.lat,
                cell.lon,
                &arrays.lats,
                &arrays.lons,
                &arrays.values,
            ) {
                Some(sea_level) => {
                    let value = match elevation {
                        Some(elev) => {
                            denormalize_from_sea_level(sea_level, elev, self.lapse_rate)
                        }
                        None => sea_level,
                    };
                    values[index] = value as f32;
                    summary.interpolated += 1;
                }
                None => {
                    summary.no_stations_in_range += 1;
                }
            }
        }

        if summary.has_gaps() {
            warn!(
                no_stations = summary.no_stations_in_range,
                no_terrain = summary.missing_terrain_data,
                "interpolation coverage gaps; cells left as no-data"
            );
        }
        info!(
            total = summary.total_cells,
            interpolated = summary.interpolated,
            no_stations = summary.no_stations_in_range,
            no_terrain = summary.missing_terrain_data,
            "interpolation complete"
        );

        let surface = RasterHandle::from_array(
            values,
            reference.width(),
            reference.height(),
            reference.geo_transform(),
            reference.spatial_ref(),
            Some(NO_DATA_SENTINEL),
        )?;
        Ok((surface, summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use projection::SpatialRef;
    use raster::GeoTransform;

    /// A small geographic-grid reference over the lower mainland.
    fn reference(width: usize, height: usize) -> RasterHandle {
        RasterHandle::from_array(
            vec![0.0; width * height],
            width,
            height,
            GeoTransform::north_up(-123.5, 49.6, 0.1, 0.1),
            SpatialRef::Geographic,
            Some(NO_DATA_SENTINEL),
        )
        .unwrap()
    }

    fn flat_dem(width: usize, height: usize, elevation: f32) -> RasterHandle {
        RasterHandle::from_array(
            vec![elevation; width * height],
            width,
            height,
            GeoTransform::north_up(-123.5, 49.6, 0.1, 0.1),
            SpatialRef::Geographic,
            Some(NO_DATA_SENTINEL),
        )
        .unwrap()
    }

    fn station(lat: f64, lon: f64, temperature: f64, rh: f64, elevation: f64) -> StationSample {
        StationSample {
            code: 1,
            lat,
            lon,
            elevation: Some(elevation),
            temperature: Some(temperature),
            relative_humidity: Some(rh),
            precipitation: Some(2.0),
            wind_speed: Some(12.0),
            ffmc: None,
            dmc: None,
            dc: None,
        }
    }

    #[test]
    fn test_plain_surface_covers_grid() {
        let stations = vec![
            station(49.3, -123.2, 18.0, 50.0, 0.0),
            station(49.5, -123.0, 16.0, 60.0, 0.0),
        ];
        let reference = reference(3, 3);
        let interpolator = SurfaceInterpolator::new();
        let (surface, summary) = interpolator
            .plain_surface(
                InterpolatedParameter::Precip,
                &stations,
                &reference,
                None,
            )
            .unwrap();

        assert_eq!(summary.total_cells, 9);
        assert_eq!(summary.interpolated, 9);
        assert_eq!(summary.no_stations_in_range, 0);
        // Both stations report 2.0 mm, so every cell must be exactly that.
        assert!(surface.data().iter().all(|&v| (v - 2.0).abs() < 1e-5));
    }

    #[test]
    fn test_no_stations_leaves_nodata() {
        let interpolator = SurfaceInterpolator {
            idw: IdwConfig {
                search_radius_m: 1_000.0,
                ..Default::default()
            },
            ..Default::default()
        };
        // Station far outside the one-kilometer radius.
        let stations = vec![station(58.0, -130.0, 18.0, 50.0, 0.0)];
        let reference = reference(2, 2);
        let (surface, summary) = interpolator
            .plain_surface(InterpolatedParameter::Temp, &stations, &reference, None)
            .unwrap();

        assert_eq!(summary.no_stations_in_range, 4);
        assert_eq!(summary.interpolated, 0);
        assert!(surface.data().iter().all(|&v| v == NO_DATA_SENTINEL));
    }

    #[test]
    fn test_temperature_lapse_round_trip_on_flat_terrain() {
        // Stations and terrain share one elevation: interpolation must
        // reproduce the observed temperature, not a shifted one.
        let elevation = 1200.0;
        let stations = vec![
            station(49.3, -123.2, 8.0, 50.0, elevation),
            station(49.5, -123.0, 8.0, 50.0, elevation),
        ];
        let reference = reference(3, 3);
        let dem = flat_dem(3, 3, elevation as f32);
        let interpolator = SurfaceInterpolator::new();
        let (surface, summary) = interpolator
            .temperature_surface(&stations, &reference, &dem, None)
            .unwrap();

        assert_eq!(summary.interpolated, 9);
        assert!(surface.data().iter().all(|&v| (v - 8.0).abs() < 1e-4));
    }

    #[test]
    fn test_temperature_descends_with_elevation() {
        // Sea-level stations, elevated terrain: grid values must be
        // cooler than the observations by the lapse amount.
        let stations = vec![
            station(49.3, -123.2, 20.0, 50.0, 0.0),
            station(49.5, -123.0, 20.0, 50.0, 0.0),
        ];
        let reference = reference(2, 2);
        let dem = flat_dem(2, 2, 1000.0);
        let interpolator = SurfaceInterpolator::new();
        let (surface, _) = interpolator
            .temperature_surface(&stations, &reference, &dem, None)
            .unwrap();

        for &v in surface.data() {
            assert!((v - 13.5).abs() < 1e-3, "expected 20 - 6.5, got {}", v);
        }
    }

    #[test]
    fn test_missing_terrain_cells_are_skipped() {
        let stations = vec![station(49.3, -123.2, 20.0, 50.0, 0.0)];
        let reference = reference(2, 2);
        let mut dem_values = vec![100.0f32; 4];
        dem_values[3] = NO_DATA_SENTINEL;
        let dem = RasterHandle::from_array(
            dem_values,
            2,
            2,
            GeoTransform::north_up(-123.5, 49.6, 0.1, 0.1),
            SpatialRef::Geographic,
            Some(NO_DATA_SENTINEL),
        )
        .unwrap();

        let interpolator = SurfaceInterpolator::new();
        let (surface, summary) = interpolator
            .temperature_surface(&stations, &reference, &dem, None)
            .unwrap();

        assert_eq!(summary.missing_terrain_data, 1);
        assert_eq!(summary.interpolated, 3);
        assert_eq!(surface.data()[3], NO_DATA_SENTINEL);
    }

    #[test]
    fn test_mask_excludes_cells() {
        let stations = vec![station(49.3, -123.2, 20.0, 50.0, 0.0)];
        let reference = reference(2, 2);
        let mask = RasterHandle::from_array(
            vec![1.0, 1.0, 0.0, 0.0],
            2,
            2,
            GeoTransform::north_up(-123.5, 49.6, 0.1, 0.1),
            SpatialRef::Geographic,
            None,
        )
        .unwrap();

        let interpolator = SurfaceInterpolator::new();
        let (surface, summary) = interpolator
            .plain_surface(
                InterpolatedParameter::Temp,
                &stations,
                &reference,
                Some(&mask),
            )
            .unwrap();

        assert_eq!(summary.masked_out, 2);
        assert_eq!(summary.interpolated, 2);
        assert_eq!(surface.data()[2], NO_DATA_SENTINEL);
        assert_eq!(surface.data()[3], NO_DATA_SENTINEL);
    }

    #[test]
    fn test_humidity_surface_clamped_and_complete() {
        let stations = vec![
            station(49.3, -123.2, 20.0, 50.0, 0.0),
            station(49.5, -123.0, 22.0, 65.0, 0.0),
        ];
        let reference = reference(3, 3);
        let dem = flat_dem(3, 3, 0.0);
        let interpolator = SurfaceInterpolator::new();

        let (temperature, _) = interpolator
            .temperature_surface(&stations, &reference, &dem, None)
            .unwrap();
        let (humidity, summary) = interpolator
            .humidity_surface(&stations, &temperature, &dem, None)
            .unwrap();

        assert_eq!(summary.interpolated, 9);
        for &rh in humidity.data() {
            assert!(rh >= 0.0 && rh <= 100.0, "rh out of range: {}", rh);
            // Between-station humidity stays between the observed extremes
            // on uniform terrain (loose bound).
            assert!(rh > 30.0 && rh < 90.0, "implausible rh: {}", rh);
        }
    }

    #[test]
    fn test_humidity_respects_missing_temperature() {
        let stations = vec![station(49.3, -123.2, 20.0, 50.0, 0.0)];
        let dem = flat_dem(2, 2, 0.0);
        let mut temp_values = vec![18.0f32; 4];
        temp_values[1] = NO_DATA_SENTINEL;
        let temperature = RasterHandle::from_array(
            temp_values,
            2,
            2,
            GeoTransform::north_up(-123.5, 49.6, 0.1, 0.1),
            SpatialRef::Geographic,
            Some(NO_DATA_SENTINEL),
        )
        .unwrap();

        let interpolator = SurfaceInterpolator::new();
        let (humidity, _) = interpolator
            .humidity_surface(&stations, &temperature, &dem, None)
            .unwrap();
        assert_eq!(humidity.data()[1], NO_DATA_SENTINEL);
        assert!(humidity.data()[0] != NO_DATA_SENTINEL);
    }
}
