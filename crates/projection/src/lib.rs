//! Coordinate reference system transformations.
//!
//! Implements map projections from scratch without external dependencies.
//! Every supported CRS converts to and from WGS84 geographic coordinates;
//! [`CrsTransform`] chains an inverse and a forward projection to move
//! coordinates between any two of them.

pub mod error;
pub mod mercator;
pub mod transform;
pub mod utm;

pub use error::ProjectionError;
pub use mercator::WebMercator;
pub use transform::{CrsTransform, Projection};
pub use utm::TransverseMercator;

/// WGS84 semi-major axis (meters).
pub const WGS84_A: f64 = 6_378_137.0;

/// WGS84 flattening.
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;
