//! Lapse-rate elevation correction.
//!
//! Station values are shifted to their sea-level equivalent before
//! interpolation, and the interpolated sea-level grid is shifted back
//! down to each cell's terrain elevation afterwards, always with the
//! same rate. Whenever elevation data exists, the
//! normalize-interpolate-denormalize pattern is mandatory.

/// Environmental lapse rate, degrees Celsius per meter of elevation.
///
/// Applied to both temperature and dew point.
pub const LAPSE_RATE_C_PER_M: f64 = 0.0065;

/// Shift a station value to its sea-level equivalent.
pub fn normalize_to_sea_level(value: f64, elevation_m: f64, rate: f64) -> f64 {
    value + elevation_m * rate
}

/// Shift a sea-level value down to the given elevation.
pub fn denormalize_from_sea_level(value: f64, elevation_m: f64, rate: f64) -> f64 {
    value - elevation_m * rate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for &(t, elev) in &[
            (21.5, 0.0),
            (-3.25, 1850.0),
            (0.0, 345.5),
            (35.0, 2700.0),
            (12.75, 11.0),
        ] {
            let sea = normalize_to_sea_level(t, elev, LAPSE_RATE_C_PER_M);
            let back = denormalize_from_sea_level(sea, elev, LAPSE_RATE_C_PER_M);
            assert!((back - t).abs() < 1e-9, "{} @ {} -> {}", t, elev, back);
        }
    }

    #[test]
    fn test_higher_station_normalizes_warmer() {
        // A mountain station's sea-level equivalent is warmer than its
        // observed value.
        let sea = normalize_to_sea_level(5.0, 2000.0, LAPSE_RATE_C_PER_M);
        assert!((sea - 18.0).abs() < 1e-12);
    }

    #[test]
    fn test_sea_level_is_identity() {
        assert_eq!(normalize_to_sea_level(17.0, 0.0, LAPSE_RATE_C_PER_M), 17.0);
        assert_eq!(
            denormalize_from_sea_level(17.0, 0.0, LAPSE_RATE_C_PER_M),
            17.0
        );
    }
}
