//! Uniform outward buffering of clipped tiles.
//!
//! The buffer of a polygon by distance `d` is built as the union of the
//! polygon itself, a rectangle of half-width `d` along every ring edge and a
//! regular polygon of radius `d` at every vertex. Curves are approximated
//! with `4 * quadrant_segments` sides per full circle.

use std::f64::consts::PI;

use geo::{BooleanOps, Coord, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TilerError};
use crate::feature::{polygonal_geometry, Feature, FeatureCollection};

/// Segments per quarter circle unless configured otherwise.
pub const DEFAULT_QUADRANT_SEGMENTS: usize = 16;

/// Parameters for buffer operations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BufferParams {
    /// Buffer distance in working CRS units; must be non-negative
    pub distance: f64,
    /// Segments used to approximate a quarter circle
    pub quadrant_segments: usize,
}

impl Default for BufferParams {
    fn default() -> Self {
        Self {
            distance: 0.0,
            quadrant_segments: DEFAULT_QUADRANT_SEGMENTS,
        }
    }
}

impl BufferParams {
    pub fn new(distance: f64) -> Self {
        Self {
            distance,
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.distance.is_finite() || self.distance < 0.0 {
            return Err(TilerError::invalid_parameter(
                "buffer_distance",
                format!("must be a non-negative number, got {}", self.distance),
            ));
        }
        if self.quadrant_segments == 0 {
            return Err(TilerError::invalid_parameter(
                "quadrant_segments",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Regular polygon approximating a circle around `center`.
fn disc(center: Coord<f64>, radius: f64, sides: usize) -> Polygon<f64> {
    let mut coords = Vec::with_capacity(sides + 1);
    for i in 0..sides {
        let angle = 2.0 * PI * i as f64 / sides as f64;
        coords.push(Coord {
            x: center.x + radius * angle.cos(),
            y: center.y + radius * angle.sin(),
        });
    }
    coords.push(coords[0]);
    Polygon::new(LineString::new(coords), vec![])
}

/// Rectangle of half-width `distance` centred on the segment `a`-`b`.
fn edge_band(a: Coord<f64>, b: Coord<f64>, distance: f64) -> Option<Polygon<f64>> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length = dx.hypot(dy);
    if length == 0.0 {
        return None;
    }
    let nx = -dy / length * distance;
    let ny = dx / length * distance;
    Some(Polygon::new(
        LineString::new(vec![
            Coord { x: a.x + nx, y: a.y + ny },
            Coord { x: b.x + nx, y: b.y + ny },
            Coord { x: b.x - nx, y: b.y - ny },
            Coord { x: a.x - nx, y: a.y - ny },
            Coord { x: a.x + nx, y: a.y + ny },
        ]),
        vec![],
    ))
}

fn rings(polygon: &Polygon<f64>) -> impl Iterator<Item = &LineString<f64>> {
    std::iter::once(polygon.exterior()).chain(polygon.interiors())
}

/// Buffer a polygonal shape by `params.distance`.
pub fn buffer_polygons(
    shape: &MultiPolygon<f64>,
    params: &BufferParams,
) -> Result<MultiPolygon<f64>> {
    params.validate()?;
    if params.distance == 0.0 {
        return Ok(shape.clone());
    }

    let sides = 4 * params.quadrant_segments;
    let mut result = shape.clone();
    for polygon in shape {
        for ring in rings(polygon) {
            for line in ring.lines() {
                if let Some(band) = edge_band(line.start, line.end, params.distance) {
                    result = result.union(&MultiPolygon::new(vec![band]));
                }
            }
            for coord in ring.coords() {
                let cap = disc(*coord, params.distance, sides);
                result = result.union(&MultiPolygon::new(vec![cap]));
            }
        }
    }
    Ok(result)
}

/// Buffer every feature, one output feature per input feature in the same order.
///
/// Output features carry geometry only; attributes are not propagated.
pub fn buffer_collection(
    input: &FeatureCollection,
    params: &BufferParams,
) -> Result<FeatureCollection> {
    params.validate()?;

    let features = input
        .iter()
        .enumerate()
        .map(|(index, feature)| {
            let shape = feature.polygons().ok_or_else(|| {
                TilerError::Geometry(format!("feature {} has no polygonal geometry to buffer", index))
            })?;
            let geometry = if params.distance == 0.0 {
                feature.geometry.clone()
            } else {
                polygonal_geometry(buffer_polygons(&shape, params)?)
            };
            Ok(Feature::new(geometry))
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(
        features = features.len(),
        distance = params.distance,
        "Buffered intersection features"
    );

    Ok(FeatureCollection::with_features(input.crs, features))
}
