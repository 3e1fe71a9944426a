//! Transformations between supported coordinate reference systems.

use grid_common::CrsCode;

use crate::error::ProjectionError;
use crate::mercator::WebMercator;
use crate::utm::TransverseMercator;

/// A CRS paired with the math that maps it to and from WGS84 lon/lat.
#[derive(Debug, Clone)]
pub enum Projection {
    Geographic,
    WebMercator(WebMercator),
    TransverseMercator(TransverseMercator),
}

impl Projection {
    pub fn for_crs(crs: CrsCode) -> Self {
        match crs {
            CrsCode::Epsg4326 => Projection::Geographic,
            CrsCode::Epsg3857 => Projection::WebMercator(WebMercator),
            CrsCode::Utm { zone, north } => {
                Projection::TransverseMercator(TransverseMercator::utm(zone, north))
            }
        }
    }

    /// Convert projected coordinates to lon/lat degrees.
    pub fn to_geographic(&self, x: f64, y: f64) -> Result<(f64, f64), ProjectionError> {
        match self {
            Projection::Geographic => check_geographic(x, y),
            Projection::WebMercator(p) => p.inverse(x, y),
            Projection::TransverseMercator(p) => p.inverse(x, y),
        }
    }

    /// Convert lon/lat degrees to projected coordinates.
    pub fn from_geographic(&self, lon: f64, lat: f64) -> Result<(f64, f64), ProjectionError> {
        match self {
            Projection::Geographic => check_geographic(lon, lat),
            Projection::WebMercator(p) => p.forward(lon, lat),
            Projection::TransverseMercator(p) => p.forward(lon, lat),
        }
    }
}

fn check_geographic(lon: f64, lat: f64) -> Result<(f64, f64), ProjectionError> {
    if !lon.is_finite() || !lat.is_finite() {
        return Err(ProjectionError::NonFinite { x: lon, y: lat });
    }
    if lat.abs() > 90.0 {
        return Err(ProjectionError::LatitudeOutOfRange(lat));
    }
    Ok((lon, lat))
}

/// Coordinate transformation from one CRS to another.
///
/// Goes through geographic coordinates, so any pair of supported CRS works.
#[derive(Debug, Clone)]
pub struct CrsTransform {
    pub source: CrsCode,
    pub target: CrsCode,
    from: Projection,
    to: Projection,
}

impl CrsTransform {
    pub fn new(source: CrsCode, target: CrsCode) -> Self {
        Self {
            source,
            target,
            from: Projection::for_crs(source),
            to: Projection::for_crs(target),
        }
    }

    /// True when source and target are the same CRS.
    pub fn is_identity(&self) -> bool {
        self.source == self.target
    }

    /// Transform a single coordinate.
    pub fn transform(&self, x: f64, y: f64) -> Result<(f64, f64), ProjectionError> {
        if self.is_identity() {
            return Ok((x, y));
        }
        let (lon, lat) = self.from.to_geographic(x, y)?;
        self.to.from_geographic(lon, lat)
    }

    /// The reverse transformation.
    pub fn inverse(&self) -> CrsTransform {
        CrsTransform::new(self.target, self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_passes_through() {
        let t = CrsTransform::new(CrsCode::UTM_46N, CrsCode::UTM_46N);
        assert!(t.is_identity());
        assert_eq!(t.transform(1.5, -2.5).unwrap(), (1.5, -2.5));
    }

    #[test]
    fn test_geographic_to_utm_and_back() {
        let t = CrsTransform::new(CrsCode::Epsg4326, CrsCode::UTM_46N);
        let (e, n) = t.transform(90.4125, 23.8103).unwrap();
        assert!((e - 236_377.436).abs() < 0.05);
        assert!((n - 2_635_628.617).abs() < 0.05);

        let (lon, lat) = t.inverse().transform(e, n).unwrap();
        assert!((lon - 90.4125).abs() < 1e-7);
        assert!((lat - 23.8103).abs() < 1e-7);
    }

    #[test]
    fn test_mercator_to_utm() {
        let to_merc = CrsTransform::new(CrsCode::Epsg4326, CrsCode::Epsg3857);
        let (x, y) = to_merc.transform(90.4125, 23.8103).unwrap();

        let t = CrsTransform::new(CrsCode::Epsg3857, CrsCode::UTM_46N);
        let (e, n) = t.transform(x, y).unwrap();
        assert!((e - 236_377.436).abs() < 0.05);
        assert!((n - 2_635_628.617).abs() < 0.05);
    }

    #[test]
    fn test_invalid_latitude_rejected() {
        let t = CrsTransform::new(CrsCode::Epsg4326, CrsCode::UTM_46N);
        assert!(t.transform(90.0, 95.0).is_err());
    }
}
