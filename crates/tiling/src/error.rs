//! Error types for the tiling crate.
//!
//! The pipeline shares [`TilerError`] with the HTTP service so that every
//! failure maps onto one status code table.

pub use grid_common::error::{TilerError, TilerResult};

/// Result type for tiling operations.
pub type Result<T> = std::result::Result<T, TilerError>;
