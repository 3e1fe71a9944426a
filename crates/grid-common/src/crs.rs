//! Coordinate Reference System types and utilities.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Well-known CRS codes supported by the tiling pipeline.
///
/// Serialized as the `EPSG:n` string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CrsCode {
    /// WGS84 Geographic (lon/lat in degrees)
    Epsg4326,
    /// Web Mercator (meters)
    Epsg3857,
    /// WGS84 / UTM zone (meters). EPSG:326zz in the north, EPSG:327zz in the south.
    Utm { zone: u8, north: bool },
}

impl CrsCode {
    /// UTM zone 46N, the default working CRS.
    pub const UTM_46N: CrsCode = CrsCode::Utm {
        zone: 46,
        north: true,
    };

    /// Parse a CRS identifier.
    ///
    /// Accepts formats like:
    /// - "EPSG:4326" / "epsg:4326"
    /// - "CRS:84" and "urn:ogc:def:crs:OGC:1.3:CRS84" (lon/lat WGS84)
    /// - "urn:ogc:def:crs:EPSG::32646" (the form GeoJSON writers emit)
    pub fn parse(s: &str) -> Result<Self, CrsParseError> {
        let normalized = s.trim().to_uppercase();

        match normalized.as_str() {
            "CRS:84" | "URN:OGC:DEF:CRS:OGC:1.3:CRS84" | "OGC:CRS84" => {
                return Ok(CrsCode::Epsg4326)
            }
            _ => {}
        }

        let code = normalized
            .strip_prefix("EPSG:")
            .or_else(|| normalized.strip_prefix("URN:OGC:DEF:CRS:EPSG::"))
            .or_else(|| normalized.strip_prefix("URN:OGC:DEF:CRS:EPSG:"))
            .ok_or_else(|| CrsParseError::UnsupportedCrs(s.to_string()))?;

        // "urn:ogc:def:crs:EPSG:6.6:4326" carries a version segment before the code
        let code = code.rsplit(':').next().unwrap_or(code);
        let code: u32 = code
            .parse()
            .map_err(|_| CrsParseError::UnsupportedCrs(s.to_string()))?;

        Self::from_epsg(code)
    }

    /// Resolve a numeric EPSG code.
    pub fn from_epsg(code: u32) -> Result<Self, CrsParseError> {
        match code {
            4326 => Ok(CrsCode::Epsg4326),
            3857 | 900913 => Ok(CrsCode::Epsg3857),
            32601..=32660 => Ok(CrsCode::Utm {
                zone: (code - 32600) as u8,
                north: true,
            }),
            32701..=32760 => Ok(CrsCode::Utm {
                zone: (code - 32700) as u8,
                north: false,
            }),
            _ => Err(CrsParseError::UnsupportedCrs(format!("EPSG:{}", code))),
        }
    }

    /// Build a UTM code, validating the zone number.
    pub fn utm(zone: u8, north: bool) -> Result<Self, CrsParseError> {
        if !(1..=60).contains(&zone) {
            return Err(CrsParseError::InvalidUtmZone(zone));
        }
        Ok(CrsCode::Utm { zone, north })
    }

    /// The UTM zone containing a geographic position.
    pub fn utm_for_lon_lat(lon: f64, lat: f64) -> Self {
        // Normalize to [-180, 180) before binning into 6 degree zones
        let lon = (lon + 180.0).rem_euclid(360.0) - 180.0;
        let zone = (((lon + 180.0) / 6.0).floor() as i32 + 1).clamp(1, 60) as u8;
        CrsCode::Utm {
            zone,
            north: lat >= 0.0,
        }
    }

    /// Numeric EPSG code.
    pub fn epsg(&self) -> u32 {
        match self {
            CrsCode::Epsg4326 => 4326,
            CrsCode::Epsg3857 => 3857,
            CrsCode::Utm { zone, north: true } => 32600 + *zone as u32,
            CrsCode::Utm { zone, north: false } => 32700 + *zone as u32,
        }
    }

    /// OGC URN form, used for the GeoJSON `crs` member.
    pub fn to_urn(&self) -> String {
        match self {
            CrsCode::Epsg4326 => "urn:ogc:def:crs:OGC:1.3:CRS84".to_string(),
            other => format!("urn:ogc:def:crs:EPSG::{}", other.epsg()),
        }
    }

    /// Check if this is a geographic (lat/lon) CRS.
    pub fn is_geographic(&self) -> bool {
        matches!(self, CrsCode::Epsg4326)
    }

    /// Linear unit name, for logs and manifests.
    pub fn unit(&self) -> &'static str {
        if self.is_geographic() {
            "degree"
        } else {
            "metre"
        }
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

impl FromStr for CrsCode {
    type Err = CrsParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CrsCode::parse(s)
    }
}

impl TryFrom<String> for CrsCode {
    type Error = CrsParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CrsCode::parse(&value)
    }
}

impl From<CrsCode> for String {
    fn from(code: CrsCode) -> Self {
        code.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CrsParseError {
    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),

    #[error("Invalid UTM zone: {0} (expected 1-60)")]
    InvalidUtmZone(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_crs() {
        assert_eq!(CrsCode::parse("EPSG:4326").unwrap(), CrsCode::Epsg4326);
        assert_eq!(CrsCode::parse("epsg:3857").unwrap(), CrsCode::Epsg3857);
        assert_eq!(CrsCode::parse("CRS:84").unwrap(), CrsCode::Epsg4326);
        assert_eq!(CrsCode::parse("EPSG:32646").unwrap(), CrsCode::UTM_46N);
        assert_eq!(
            CrsCode::parse("urn:ogc:def:crs:EPSG::32733").unwrap(),
            CrsCode::Utm {
                zone: 33,
                north: false
            }
        );
        assert_eq!(
            CrsCode::parse("urn:ogc:def:crs:OGC:1.3:CRS84").unwrap(),
            CrsCode::Epsg4326
        );
        assert!(CrsCode::parse("EPSG:99999").is_err());
        assert!(CrsCode::parse("EPSG:32661").is_err());
        assert!(CrsCode::parse("garbage").is_err());
    }

    #[test]
    fn test_epsg_round_trip() {
        for code in [4326, 3857, 32601, 32646, 32660, 32701, 32760] {
            assert_eq!(CrsCode::from_epsg(code).unwrap().epsg(), code);
        }
    }

    #[test]
    fn test_utm_for_lon_lat() {
        // Dhaka
        assert_eq!(CrsCode::utm_for_lon_lat(90.4, 23.8), CrsCode::Utm { zone: 46, north: true });
        // Sydney
        assert_eq!(
            CrsCode::utm_for_lon_lat(151.2, -33.9),
            CrsCode::Utm {
                zone: 56,
                north: false
            }
        );
        assert_eq!(CrsCode::utm_for_lon_lat(-180.0, 0.0), CrsCode::Utm { zone: 1, north: true });
        assert_eq!(CrsCode::utm_for_lon_lat(180.0, 0.0), CrsCode::Utm { zone: 1, north: true });
        assert_eq!(CrsCode::utm_for_lon_lat(179.9, 0.0), CrsCode::Utm { zone: 60, north: true });
    }

    #[test]
    fn test_serde_string_form() {
        let json = serde_json::to_string(&CrsCode::UTM_46N).unwrap();
        assert_eq!(json, "\"EPSG:32646\"");
        let back: CrsCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, CrsCode::UTM_46N);
    }
}
