//! Projection error types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    #[error("Latitude {0} is outside the projection domain")]
    LatitudeOutOfRange(f64),

    #[error("Coordinate ({x}, {y}) is not finite")]
    NonFinite { x: f64, y: f64 },

    #[error("Coordinate ({x}, {y}) is outside the valid area of {crs}")]
    OutsideDomain { x: f64, y: f64, crs: String },
}

impl From<ProjectionError> for grid_common::TilerError {
    fn from(err: ProjectionError) -> Self {
        grid_common::TilerError::Projection(err.to_string())
    }
}
