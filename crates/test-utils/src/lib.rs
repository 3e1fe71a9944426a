//! Shared test utilities for the survey grid workspace.
//!
//! This crate provides common testing infrastructure including:
//! - AOI documents (KML, GeoJSON) for decoder and pipeline tests
//! - Polygon ring generators
//! - Scratch directory helpers
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{fixtures, square_ring};
//! ```

pub mod fixtures;
pub mod generators;
pub mod paths;

// Re-export commonly used items at the crate root
pub use generators::*;
pub use paths::*;

/// Assert that two lengths or areas agree within `tolerance`.
#[macro_export]
macro_rules! assert_approx_eq {
    ($actual:expr, $expected:expr, $tolerance:expr) => {{
        let actual: f64 = $actual;
        let expected: f64 = $expected;
        let tolerance: f64 = $tolerance;
        assert!(
            (actual - expected).abs() <= tolerance,
            "{} = {} differs from {} by more than {}",
            stringify!($actual),
            actual,
            expected,
            tolerance
        );
    }};
}
