//! In-memory feature model shared by every pipeline stage.

use geo::{CoordsIter, Geometry, MapCoords, MultiPolygon, Polygon};
use grid_common::{BoundingBox, CrsCode};
use projection::CrsTransform;
use serde_json::{Map, Value};

use crate::error::{Result, TilerError};

/// Feature attributes. Keys serialize in sorted order, so output is stable.
pub type Properties = Map<String, Value>;

/// One geometry with its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Geometry<f64>,
    pub properties: Properties,
}

impl Feature {
    /// Create a feature without attributes.
    pub fn new(geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            geometry: geometry.into(),
            properties: Properties::new(),
        }
    }

    /// Replace the attributes.
    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    /// Set a single attribute.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Bounding box of the geometry, `None` if it has no coordinates.
    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.geometry.coords_iter().map(|c| (c.x, c.y)))
    }

    /// The polygonal part of the geometry, if any.
    ///
    /// Points and lines have no area and yield `None`; a GeometryCollection
    /// contributes whichever of its members are polygonal.
    pub fn polygons(&self) -> Option<MultiPolygon<f64>> {
        let mut polygons = Vec::new();
        collect_polygons(&self.geometry, &mut polygons);
        if polygons.is_empty() {
            None
        } else {
            Some(MultiPolygon::new(polygons))
        }
    }
}

fn collect_polygons(geometry: &Geometry<f64>, out: &mut Vec<Polygon<f64>>) {
    match geometry {
        Geometry::Polygon(p) => out.push(p.clone()),
        Geometry::MultiPolygon(mp) => out.extend(mp.0.iter().cloned()),
        Geometry::Rect(r) => out.push(r.to_polygon()),
        Geometry::Triangle(t) => out.push(t.to_polygon()),
        Geometry::GeometryCollection(gc) => {
            for g in gc.iter() {
                collect_polygons(g, out);
            }
        }
        _ => {}
    }
}

/// Collapse a clipping or buffering result into the simplest geometry.
pub fn polygonal_geometry(mut multi: MultiPolygon<f64>) -> Geometry<f64> {
    if multi.0.len() == 1 {
        Geometry::Polygon(multi.0.remove(0))
    } else {
        Geometry::MultiPolygon(multi)
    }
}

/// An ordered sequence of features sharing one CRS.
///
/// A `None` CRS means the source did not declare one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureCollection {
    pub crs: Option<CrsCode>,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(crs: Option<CrsCode>) -> Self {
        Self {
            crs,
            features: Vec::new(),
        }
    }

    pub fn with_features(crs: Option<CrsCode>, features: Vec<Feature>) -> Self {
        Self { crs, features }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    /// Bounding box covering every feature, `None` if no feature has coordinates.
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.features
            .iter()
            .filter_map(Feature::bounds)
            .reduce(|acc, b| acc.union(&b))
    }

    /// Reproject every geometry into `target`.
    ///
    /// Fails with `InvalidCrs` if the collection has no CRS.
    pub fn reproject(&self, target: CrsCode) -> Result<FeatureCollection> {
        let source = self.crs.ok_or_else(|| {
            TilerError::InvalidCrs("cannot reproject a collection without a CRS".to_string())
        })?;

        let transform = CrsTransform::new(source, target);
        if transform.is_identity() {
            return Ok(FeatureCollection::with_features(
                Some(target),
                self.features.clone(),
            ));
        }

        let transform = &transform;
        let features = self
            .features
            .iter()
            .map(|feature| {
                let geometry = feature.geometry.try_map_coords(|c| {
                    transform
                        .transform(c.x, c.y)
                        .map(|(x, y)| geo::Coord { x, y })
                })?;
                Ok(Feature {
                    geometry,
                    properties: feature.properties.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(FeatureCollection::with_features(Some(target), features))
    }
}

impl<'a> IntoIterator for &'a FeatureCollection {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, point, polygon, GeometryCollection};

    fn square(x: f64, y: f64, size: f64) -> Polygon<f64> {
        polygon![
            (x: x, y: y),
            (x: x + size, y: y),
            (x: x + size, y: y + size),
            (x: x, y: y + size),
        ]
    }

    #[test]
    fn test_bounds_over_features() {
        let mut fc = FeatureCollection::new(Some(CrsCode::UTM_46N));
        fc.push(Feature::new(square(0.0, 0.0, 10.0)));
        fc.push(Feature::new(point!(x: -5.0, y: 20.0)));
        assert_eq!(fc.bounds(), Some(BoundingBox::new(-5.0, 0.0, 10.0, 20.0)));
    }

    #[test]
    fn test_polygons_from_mixed_collection() {
        let gc = GeometryCollection::new_from(vec![
            Geometry::Polygon(square(0.0, 0.0, 1.0)),
            Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)]),
        ]);
        let feature = Feature::new(Geometry::GeometryCollection(gc));
        assert_eq!(feature.polygons().unwrap().0.len(), 1);

        let line = Feature::new(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)]);
        assert!(line.polygons().is_none());
    }

    #[test]
    fn test_reproject_keeps_properties() {
        let mut fc = FeatureCollection::new(Some(CrsCode::Epsg4326));
        fc.push(Feature::new(point!(x: 93.0, y: 0.0)).with_property("name", "origin"));

        let projected = fc.reproject(CrsCode::UTM_46N).unwrap();
        assert_eq!(projected.crs, Some(CrsCode::UTM_46N));
        assert_eq!(projected.features[0].properties["name"], "origin");
        match &projected.features[0].geometry {
            Geometry::Point(p) => {
                assert!((p.x() - 500_000.0).abs() < 1e-6);
                assert!(p.y().abs() < 1e-6);
            }
            other => panic!("unexpected geometry {:?}", other),
        }
    }

    #[test]
    fn test_reproject_without_crs_fails() {
        let fc = FeatureCollection::new(None);
        assert!(matches!(
            fc.reproject(CrsCode::UTM_46N),
            Err(TilerError::InvalidCrs(_))
        ));
    }
}
