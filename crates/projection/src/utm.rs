//! Transverse Mercator projection (UTM) on the WGS84 ellipsoid.
//!
//! Uses the Krüger series in the third flattening `n`, truncated after the
//! third term. Within a UTM zone (±3° from the central meridian) this is
//! accurate to well under a millimetre, and it stays usable several degrees
//! outside the zone, which matters when an AOI straddles a zone boundary
//! but is projected with a single fixed zone.
//!
//! UTM parameters:
//! - Scale factor on the central meridian: 0.9996
//! - False easting: 500 000 m
//! - False northing: 0 m (north), 10 000 000 m (south)
//! - Central meridian of zone z: 6z - 183 degrees

use std::f64::consts::FRAC_PI_2;

use crate::error::ProjectionError;
use crate::{WGS84_A, WGS84_F};

const UTM_SCALE: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// UTM limits itself to 84°N..80°S; the series itself is fine a bit further.
const MAX_LATITUDE: f64 = 84.5;

/// A Transverse Mercator projection with precomputed series coefficients.
#[derive(Debug, Clone)]
pub struct TransverseMercator {
    /// Central meridian in radians
    pub lon0: f64,
    /// Scale factor on the central meridian
    pub k0: f64,
    /// False easting (meters)
    pub false_easting: f64,
    /// False northing (meters)
    pub false_northing: f64,
    /// Third flattening
    n: f64,
    /// Rectifying radius
    big_a: f64,
    /// Forward series coefficients
    alpha: [f64; 3],
    /// Inverse series coefficients
    beta: [f64; 3],
    /// Conformal-to-geodetic latitude coefficients
    delta: [f64; 3],
}

impl TransverseMercator {
    /// Create the projection for a UTM zone (1..=60).
    pub fn utm(zone: u8, north: bool) -> Self {
        let lon0_deg = zone as f64 * 6.0 - 183.0;
        let false_northing = if north { 0.0 } else { UTM_FALSE_NORTHING_SOUTH };
        Self::new(lon0_deg, UTM_SCALE, UTM_FALSE_EASTING, false_northing)
    }

    /// Create a general Transverse Mercator projection on WGS84.
    pub fn new(lon0_deg: f64, k0: f64, false_easting: f64, false_northing: f64) -> Self {
        let n = WGS84_F / (2.0 - WGS84_F);
        let n2 = n * n;
        let n3 = n2 * n;

        let big_a = WGS84_A / (1.0 + n) * (1.0 + n2 / 4.0 + n2 * n2 / 64.0);

        let alpha = [
            n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0,
            13.0 * n2 / 48.0 - 3.0 * n3 / 5.0,
            61.0 * n3 / 240.0,
        ];
        let beta = [
            n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0,
            n2 / 48.0 + n3 / 15.0,
            17.0 * n3 / 480.0,
        ];
        let delta = [
            2.0 * n - 2.0 * n2 / 3.0 - 2.0 * n3,
            7.0 * n2 / 3.0 - 8.0 * n3 / 5.0,
            56.0 * n3 / 15.0,
        ];

        Self {
            lon0: lon0_deg.to_radians(),
            k0,
            false_easting,
            false_northing,
            n,
            big_a,
            alpha,
            beta,
            delta,
        }
    }

    /// Central meridian in degrees.
    pub fn central_meridian(&self) -> f64 {
        self.lon0.to_degrees()
    }

    /// Project geographic coordinates (degrees) to easting/northing (meters).
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

        let phi = lat_deg.to_radians();
        let dlon = normalize_angle(lon_deg.to_radians() - self.lon0);

        // Conformal latitude, expressed through its tangent
        let c = 2.0 * self.n.sqrt() / (1.0 + self.n);
        let sin_phi = phi.sin();
        let t = (sin_phi.atanh() - c * (c * sin_phi).atanh()).sinh();

        let xi_p = t.atan2(dlon.cos());
        let eta_p = (dlon.sin() / (1.0 + t * t).sqrt()).atanh();

        let mut xi = xi_p;
        let mut eta = eta_p;
        for (j, a) in self.alpha.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            xi += a * (k * xi_p).sin() * (k * eta_p).cosh();
            eta += a * (k * xi_p).cos() * (k * eta_p).sinh();
        }

        let easting = self.false_easting + self.k0 * self.big_a * eta;
        let northing = self.false_northing + self.k0 * self.big_a * xi;
        Ok((easting, northing))
    }

    /// Unproject easting/northing (meters) to geographic coordinates (degrees).
    pub fn inverse(&self, easting: f64, northing: f64) -> Result<(f64, f64), ProjectionError> {
        if !easting.is_finite() || !northing.is_finite() {
            return Err(ProjectionError::NonFinite {
                x: easting,
                y: northing,
            });
        }

        let xi = (northing - self.false_northing) / (self.k0 * self.big_a);
        let eta = (easting - self.false_easting) / (self.k0 * self.big_a);

        if xi.abs() > FRAC_PI_2 {
            return Err(ProjectionError::OutsideDomain {
                x: easting,
                y: northing,
                crs: "Transverse Mercator".to_string(),
            });
        }

        let mut xi_p = xi;
        let mut eta_p = eta;
        for (j, b) in self.beta.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            xi_p -= b * (k * xi).sin() * (k * eta).cosh();
            eta_p -= b * (k * xi).cos() * (k * eta).sinh();
        }

        let chi = (xi_p.sin() / eta_p.cosh()).asin();
        let mut phi = chi;
        for (j, d) in self.delta.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            phi += d * (k * chi).sin();
        }

        let lon = self.lon0 + eta_p.sinh().atan2(xi_p.cos());
        Ok((normalize_angle(lon).to_degrees(), phi.to_degrees()))
    }
}

/// Wrap an angle in radians to [-π, π].
fn normalize_angle(mut angle: f64) -> f64 {
    use std::f64::consts::PI;
    while angle > PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}
