//! Common types and utilities shared across the survey grid crates.

pub mod bbox;
pub mod crs;
pub mod error;

pub use bbox::BoundingBox;
pub use crs::{CrsCode, CrsParseError};
pub use error::{TilerError, TilerResult};
