//! Magnus-formula humidity conversions.
//!
//! Relative humidity is never interpolated directly. Each station's
//! temperature and humidity become a dew point, the dew point field is
//! interpolated like temperature, and the grid is converted back to
//! relative humidity against the interpolated temperature surface.

/// Magnus formula coefficient a (dimensionless).
const MAGNUS_A: f64 = 17.625;

/// Magnus formula coefficient b, degrees Celsius.
const MAGNUS_B: f64 = 243.04;

/// Dew point temperature from air temperature and relative humidity.
///
/// Humidity is taken as a percentage; values at or below zero have no
/// finite dew point and are floored to a trace amount.
pub fn dew_point(temp_c: f64, rh_pct: f64) -> f64 {
    let rh = rh_pct.clamp(0.1, 100.0);
    let alpha = (rh / 100.0).ln() + MAGNUS_A * temp_c / (MAGNUS_B + temp_c);
    MAGNUS_B * alpha / (MAGNUS_A - alpha)
}

/// Relative humidity (percent) from air temperature and dew point.
///
/// This is the only sanctioned humidity clamp: results are bounded to
/// [0, 100].
pub fn relative_humidity(temp_c: f64, dew_point_c: f64) -> f64 {
    let saturation = |t: f64| (MAGNUS_A * t / (MAGNUS_B + t)).exp();
    let rh = 100.0 * saturation(dew_point_c) / saturation(temp_c);
    rh.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dew_point_equals_temp_gives_100_percent() {
        for t in [-10.0, 0.0, 10.0, 20.0, 30.0] {
            let rh = relative_humidity(t, t);
            assert!((rh - 100.0).abs() < 1e-9, "t={} rh={}", t, rh);
        }
    }

    #[test]
    fn test_lower_dew_point_gives_lower_rh() {
        let rh_high = relative_humidity(20.0, 18.0);
        let rh_mid = relative_humidity(20.0, 12.0);
        let rh_low = relative_humidity(20.0, 4.0);
        assert!(rh_high > rh_mid && rh_mid > rh_low);
    }

    #[test]
    fn test_known_meteorological_value() {
        // 20 degC with a 10 degC dew point is just over 50% humidity.
        let rh = relative_humidity(20.0, 10.0);
        assert!(rh > 50.0 && rh < 55.0, "got {}", rh);
    }

    #[test]
    fn test_rh_clamped_to_0_100() {
        // Dew point above air temperature would exceed saturation.
        assert_eq!(relative_humidity(10.0, 20.0), 100.0);
        // An absurdly dry dew point stays at the floor.
        assert!(relative_humidity(20.0, -70.0) >= 0.0);
    }

    #[test]
    fn test_dew_point_round_trip() {
        for &(t, rh) in &[(20.0, 50.0), (5.0, 85.0), (30.0, 20.0), (-5.0, 65.0)] {
            let dew = dew_point(t, rh);
            let back = relative_humidity(t, dew);
            assert!((back - rh).abs() < 1e-6, "t={} rh={} -> {}", t, rh, back);
        }
    }

    #[test]
    fn test_dew_point_never_exceeds_temperature() {
        for &(t, rh) in &[(25.0, 99.0), (0.0, 40.0), (-12.0, 75.0)] {
            assert!(dew_point(t, rh) <= t + 1e-9);
        }
    }
}
