//! Inverse distance weighting over great-circle distances.

/// Earth radius used for great-circle distances, meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Distance below which a target is treated as coincident with a station.
const EXACT_MATCH_M: f64 = 1.0;

/// Great-circle (Haversine) distance between two points, in meters.
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_M * c
}

/// IDW parameters.
#[derive(Debug, Clone, Copy)]
pub struct IdwConfig {
    /// Weight exponent; higher concentrates influence locally.
    pub power: f64,
    /// Stations beyond this distance never contribute, meters.
    pub search_radius_m: f64,
    /// Cap on the number of nearest contributing stations.
    pub max_stations: Option<usize>,
}

impl Default for IdwConfig {
    fn default() -> Self {
        Self {
            power: 2.0,
            search_radius_m: 200_000.0,
            max_stations: Some(12),
        }
    }
}

/// Interpolate a value at one target point.
///
/// Returns None when no station with a finite value lies within the
/// search radius - the result is then no-data, never an extrapolation. A
/// station within one meter of the target short-circuits to its exact
/// value. The interpolated value is a weighted average, so it always lies
/// within the [min, max] of the contributing values.
pub fn idw_at(
    config: &IdwConfig,
    target_lat: f64,
    target_lon: f64,
    lats: &[f64],
    lons: &[f64],
    values: &[f64],
) -> Option<f64> {
    debug_assert_eq!(lats.len(), lons.len());
    debug_assert_eq!(lats.len(), values.len());

    let mut in_range: Vec<(f64, f64)> = Vec::new();
    for i in 0..lats.len() {
        let value = values[i];
        if !value.is_finite() {
            continue;
        }
        let distance = haversine_distance_m(target_lat, target_lon, lats[i], lons[i]);
        if distance <= config.search_radius_m {
            in_range.push((distance, value));
        }
    }

    if in_range.is_empty() {
        return None;
    }

    in_range.sort_by(|a, b| a.0.total_cmp(&b.0));

    if in_range[0].0 < EXACT_MATCH_M {
        return Some(in_range[0].1);
    }

    if let Some(max) = config.max_stations {
        in_range.truncate(max.max(1));
    }

    let mut weight_sum = 0.0;
    let mut weighted_value_sum = 0.0;
    for (distance, value) in &in_range {
        let weight = 1.0 / distance.powf(config.power);
        weight_sum += weight;
        weighted_value_sum += weight * value;
    }

    Some(weighted_value_sum / weight_sum)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // Vancouver to Kamloops is roughly 250 km.
        let d = haversine_distance_m(49.28, -123.12, 50.67, -120.33);
        assert!(d > 240_000.0 && d < 260_000.0, "got {}", d);
    }

    #[test]
    fn test_haversine_zero_distance() {
        assert!(haversine_distance_m(50.0, -120.0, 50.0, -120.0) < 1e-9);
    }

    #[test]
    fn test_exact_match_returns_station_value() {
        let config = IdwConfig::default();
        let value = idw_at(
            &config,
            49.5,
            -123.0,
            &[49.5, 50.0],
            &[-123.0, -123.0],
            &[15.0, 20.0],
        );
        assert_eq!(value, Some(15.0));
    }

    #[test]
    fn test_no_stations_in_range_is_none() {
        let config = IdwConfig {
            search_radius_m: 10_000.0,
            ..Default::default()
        };
        let value = idw_at(
            &config,
            60.0,
            -130.0,
            &[49.0, 50.0],
            &[-123.0, -123.0],
            &[15.0, 20.0],
        );
        assert_eq!(value, None);
    }

    #[test]
    fn test_empty_stations_is_none() {
        let config = IdwConfig::default();
        assert_eq!(idw_at(&config, 50.0, -123.0, &[], &[], &[]), None);
    }

    #[test]
    fn test_result_bounded_by_contributors() {
        let config = IdwConfig::default();
        let lats = [49.0, 49.5, 50.0];
        let lons = [-123.0, -122.5, -123.5];
        let values = [12.0, 17.0, 22.0];
        let value = idw_at(&config, 49.4, -123.1, &lats, &lons, &values).unwrap();
        assert!(value >= 12.0 && value <= 22.0, "got {}", value);
    }

    #[test]
    fn test_closer_station_dominates() {
        let config = IdwConfig::default();
        // Target sits right next to the first station.
        let value = idw_at(
            &config,
            49.01,
            -123.0,
            &[49.0, 50.0],
            &[-123.0, -123.0],
            &[10.0, 30.0],
        )
        .unwrap();
        assert!(value < 11.0, "got {}", value);
    }

    #[test]
    fn test_missing_values_are_skipped() {
        let config = IdwConfig::default();
        let value = idw_at(
            &config,
            49.5,
            -123.25,
            &[49.4, 49.6],
            &[-123.2, -123.3],
            &[f64::NAN, 21.0],
        )
        .unwrap();
        assert!((value - 21.0).abs() < 1e-9);
    }

    #[test]
    fn test_max_stations_caps_contributors() {
        // Ring of 20 stations at similar distance; cap at 3 must still
        // produce a bounded average.
        let config = IdwConfig {
            max_stations: Some(3),
            ..Default::default()
        };
        let mut lats = Vec::new();
        let mut lons = Vec::new();
        let mut values = Vec::new();
        for i in 0..20 {
            lats.push(49.0 + 0.01 * f64::from(i));
            lons.push(-123.0);
            values.push(f64::from(i));
        }
        let value = idw_at(&config, 49.0, -123.05, &lats, &lons, &values).unwrap();
        // Only the three nearest (values 0, 1, 2) may contribute.
        assert!(value <= 2.0, "got {}", value);
    }
}
