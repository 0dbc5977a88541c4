//! Albers equal-area conic projection.
//!
//! The provincial raster grid (EPSG:3005, "BC Albers") uses a secant cone
//! with standard parallels at 50° and 58.5° N, origin at 45° N / 126° W,
//! and a 1,000,000 m false easting. The spherical form is used; forward and
//! inverse are exact inverses of each other on the sphere.

use std::f64::consts::PI;

/// Mean earth radius in meters (authalic sphere).
const EARTH_RADIUS: f64 = 6_371_007.2;

/// Albers equal-area conic projection parameters.
#[derive(Debug, Clone)]
pub struct AlbersEqualArea {
    /// Central meridian in radians.
    lon0: f64,
    /// False easting (meters).
    false_easting: f64,
    /// False northing (meters).
    false_northing: f64,
    /// Cone constant.
    n: f64,
    /// C constant.
    c: f64,
    /// Radial distance to the latitude of origin.
    rho0: f64,
}

impl AlbersEqualArea {
    /// Create a projection from parameters in degrees/meters.
    ///
    /// # Arguments
    /// * `lat0_deg` - Latitude of origin
    /// * `lon0_deg` - Central meridian
    /// * `sp1_deg` - First standard parallel
    /// * `sp2_deg` - Second standard parallel
    /// * `false_easting` - False easting (meters)
    /// * `false_northing` - False northing (meters)
    pub fn new(
        lat0_deg: f64,
        lon0_deg: f64,
        sp1_deg: f64,
        sp2_deg: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        let to_rad = PI / 180.0;
        let lat0 = lat0_deg * to_rad;
        let lon0 = lon0_deg * to_rad;
        let sp1 = sp1_deg * to_rad;
        let sp2 = sp2_deg * to_rad;

        // Cone constant from the two standard parallels
        let n = (sp1.sin() + sp2.sin()) / 2.0;
        let c = sp1.cos().powi(2) + 2.0 * n * sp1.sin();
        let rho0 = EARTH_RADIUS * (c - 2.0 * n * lat0.sin()).sqrt() / n;

        Self {
            lon0,
            false_easting,
            false_northing,
            n,
            c,
            rho0,
        }
    }

    /// The EPSG:3005 parameter set.
    pub fn bc_albers() -> Self {
        Self::new(45.0, -126.0, 50.0, 58.5, 1_000_000.0, 0.0)
    }

    /// Geographic (lon, lat) in degrees to projected (x, y) in meters.
    pub fn forward(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let to_rad = PI / 180.0;
        let lat = lat_deg * to_rad;
        let lon = lon_deg * to_rad;

        let rho = EARTH_RADIUS * (self.c - 2.0 * self.n * lat.sin()).sqrt() / self.n;
        let theta = self.n * (lon - self.lon0);

        let x = self.false_easting + rho * theta.sin();
        let y = self.false_northing + self.rho0 - rho * theta.cos();
        (x, y)
    }

    /// Projected (x, y) in meters to geographic (lon, lat) in degrees.
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let to_deg = 180.0 / PI;
        let dx = x - self.false_easting;
        let dy = self.rho0 - (y - self.false_northing);

        let rho = (dx * dx + dy * dy).sqrt();
        let theta = dx.atan2(dy);

        let sin_lat = (self.c - (rho * self.n / EARTH_RADIUS).powi(2)) / (2.0 * self.n);
        let lat = sin_lat.clamp(-1.0, 1.0).asin();
        let lon = self.lon0 + theta / self.n;

        (lon * to_deg, lat * to_deg)
    }
}
