//! Spherical (web) mercator projection, EPSG:3857.
//!
//! Used only for the tiled companion copies served to web maps.

use std::f64::consts::PI;

/// Earth radius used by web mercator (WGS84 semi-major axis).
const EARTH_RADIUS: f64 = 6_378_137.0;

/// Latitude bound beyond which web mercator is undefined.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Spherical mercator projection.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebMercator;

impl WebMercator {
    pub fn new() -> Self {
        Self
    }

    /// Geographic (lon, lat) in degrees to projected (x, y) in meters.
    ///
    /// Latitude is clamped to the projection's valid range.
    pub fn forward(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let lat = lat_deg.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        let x = EARTH_RADIUS * lon_deg.to_radians();
        let y = EARTH_RADIUS * (PI / 4.0 + lat / 2.0).tan().ln();
        (x, y)
    }

    /// Projected (x, y) in meters to geographic (lon, lat) in degrees.
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let lon = (x / EARTH_RADIUS).to_degrees();
        let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
        (lon, lat)
    }
}
