//! Spherical (Web) Mercator, EPSG:3857.

use std::f64::consts::{FRAC_PI_4, PI};

use crate::error::ProjectionError;
use crate::WGS84_A;

/// Latitude limit where Web Mercator becomes a square world.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Web Mercator projection on a sphere of radius `WGS84_A`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebMercator;

impl WebMercator {
    /// Half the width of the projected world (meters).
    pub const HALF_EXTENT: f64 = PI * WGS84_A;

    pub fn forward(&self, lon_deg: f64, lat_deg: f64) -> Result<(f64, f64), ProjectionError> {
        if !lon_deg.is_finite() || !lat_deg.is_finite() {
            return Err(ProjectionError::NonFinite {
                x: lon_deg,
                y: lat_deg,
            });
        }
        if lat_deg.abs() > MAX_LATITUDE {
            return Err(ProjectionError::LatitudeOutOfRange(lat_deg));
        }
        let x = WGS84_A * lon_deg.to_radians();
        let y = WGS84_A * (FRAC_PI_4 + lat_deg.to_radians() / 2.0).tan().ln();
        Ok((x, y))
    }

    pub fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), ProjectionError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(ProjectionError::NonFinite { x, y });
        }
        let lon = (x / WGS84_A).to_degrees();
        let lat = (2.0 * (y / WGS84_A).exp().atan() - PI / 2.0).to_degrees();
        Ok((lon, lat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_corner() {
        let (x, y) = WebMercator.forward(180.0, MAX_LATITUDE).unwrap();
        assert!((x - WebMercator::HALF_EXTENT).abs() < 1e-6);
        assert!((y - WebMercator::HALF_EXTENT).abs() < 1e-3);
    }

    #[test]
    fn test_roundtrip() {
        let (x, y) = WebMercator.forward(-73.985428, 40.748817).unwrap();
        let (lon, lat) = WebMercator.inverse(x, y).unwrap();
        assert!((lon + 73.985428).abs() < 1e-9);
        assert!((lat - 40.748817).abs() < 1e-9);
    }
}
