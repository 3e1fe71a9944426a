//! GeoJSON encoding and decoding for layers and uploads.
//!
//! Layers are written with a legacy named `crs` member so that projected
//! coordinates (UTM meters) can be told apart from RFC 7946 lon/lat.
//! On read, a missing `crs` member leaves the collection's CRS unset.

use geo::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};
use grid_common::CrsCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{Result, TilerError};
use crate::feature::{Feature, FeatureCollection, Properties};

/// A GeoJSON position. Extra ordinates (altitude) are accepted and dropped.
pub type Position = Vec<f64>;

/// A GeoJSON FeatureCollection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeoJsonFeatureCollection {
    /// Type identifier (always "FeatureCollection").
    #[serde(rename = "type")]
    pub type_: String,

    /// Optional layer name, as written by GDAL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Legacy named CRS member.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<Value>,

    /// Array of features.
    pub features: Vec<GeoJsonFeature>,
}

/// A GeoJSON Feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeoJsonFeature {
    /// Type identifier (always "Feature").
    #[serde(rename = "type")]
    pub type_: String,

    /// Optional feature identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    /// Attribute object (`null` is accepted on read).
    #[serde(default)]
    pub properties: Option<Properties>,

    /// The geometry of this feature (`null` is accepted on read).
    pub geometry: Option<GeoJsonGeometry>,
}

/// GeoJSON geometry objects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum GeoJsonGeometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    GeometryCollection { geometries: Vec<GeoJsonGeometry> },
}

// =============================================================================
// geo -> GeoJSON
// =============================================================================

fn position(c: Coord<f64>) -> Position {
    vec![c.x, c.y]
}

fn line_positions(line: &LineString<f64>) -> Vec<Position> {
    line.coords().map(|c| position(*c)).collect()
}

fn polygon_positions(polygon: &Polygon<f64>) -> Vec<Vec<Position>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(line_positions)
        .collect()
}

impl From<&Geometry<f64>> for GeoJsonGeometry {
    fn from(geometry: &Geometry<f64>) -> Self {
        match geometry {
            Geometry::Point(p) => GeoJsonGeometry::Point {
                coordinates: position(p.0),
            },
            Geometry::Line(l) => GeoJsonGeometry::LineString {
                coordinates: vec![position(l.start), position(l.end)],
            },
            Geometry::LineString(ls) => GeoJsonGeometry::LineString {
                coordinates: line_positions(ls),
            },
            Geometry::Polygon(p) => GeoJsonGeometry::Polygon {
                coordinates: polygon_positions(p),
            },
            Geometry::MultiPoint(mp) => GeoJsonGeometry::MultiPoint {
                coordinates: mp.iter().map(|p| position(p.0)).collect(),
            },
            Geometry::MultiLineString(mls) => GeoJsonGeometry::MultiLineString {
                coordinates: mls.iter().map(line_positions).collect(),
            },
            Geometry::MultiPolygon(mp) => GeoJsonGeometry::MultiPolygon {
                coordinates: mp.iter().map(polygon_positions).collect(),
            },
            Geometry::GeometryCollection(gc) => GeoJsonGeometry::GeometryCollection {
                geometries: gc.iter().map(GeoJsonGeometry::from).collect(),
            },
            Geometry::Rect(r) => GeoJsonGeometry::Polygon {
                coordinates: polygon_positions(&r.to_polygon()),
            },
            Geometry::Triangle(t) => GeoJsonGeometry::Polygon {
                coordinates: polygon_positions(&t.to_polygon()),
            },
        }
    }
}

// =============================================================================
// GeoJSON -> geo
// =============================================================================

fn coord(position: &[f64]) -> Result<Coord<f64>> {
    match position {
        [x, y, ..] if x.is_finite() && y.is_finite() => Ok(Coord { x: *x, y: *y }),
        _ => Err(TilerError::Decode(format!(
            "invalid GeoJSON position {:?}",
            position
        ))),
    }
}

fn line_string(positions: &[Position]) -> Result<LineString<f64>> {
    positions
        .iter()
        .map(|p| coord(p))
        .collect::<Result<Vec<_>>>()
        .map(LineString::new)
}

fn polygon(rings: &[Vec<Position>]) -> Result<Polygon<f64>> {
    let mut rings = rings.iter().map(|r| line_string(r));
    let exterior = match rings.next() {
        Some(ring) => ring?,
        None => LineString::new(Vec::new()),
    };
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

impl TryFrom<&GeoJsonGeometry> for Geometry<f64> {
    type Error = TilerError;

    fn try_from(geometry: &GeoJsonGeometry) -> Result<Self> {
        Ok(match geometry {
            GeoJsonGeometry::Point { coordinates } => Geometry::Point(Point(coord(coordinates)?)),
            GeoJsonGeometry::MultiPoint { coordinates } => Geometry::MultiPoint(MultiPoint::new(
                coordinates
                    .iter()
                    .map(|p| coord(p).map(Point))
                    .collect::<Result<Vec<_>>>()?,
            )),
            GeoJsonGeometry::LineString { coordinates } => {
                Geometry::LineString(line_string(coordinates)?)
            }
            GeoJsonGeometry::MultiLineString { coordinates } => {
                Geometry::MultiLineString(MultiLineString::new(
                    coordinates
                        .iter()
                        .map(|l| line_string(l))
                        .collect::<Result<Vec<_>>>()?,
                ))
            }
            GeoJsonGeometry::Polygon { coordinates } => Geometry::Polygon(polygon(coordinates)?),
            GeoJsonGeometry::MultiPolygon { coordinates } => {
                Geometry::MultiPolygon(MultiPolygon::new(
                    coordinates
                        .iter()
                        .map(|p| polygon(p))
                        .collect::<Result<Vec<_>>>()?,
                ))
            }
            GeoJsonGeometry::GeometryCollection { geometries } => {
                Geometry::GeometryCollection(GeometryCollection::new_from(
                    geometries
                        .iter()
                        .map(Geometry::try_from)
                        .collect::<Result<Vec<_>>>()?,
                ))
            }
        })
    }
}

// =============================================================================
// Documents
// =============================================================================

/// Build the legacy named `crs` member for a CRS.
pub fn named_crs(crs: CrsCode) -> Value {
    json!({
        "type": "name",
        "properties": { "name": crs.to_urn() }
    })
}

/// Read a named `crs` member. Non-named members (links) are rejected.
pub fn parse_named_crs(member: &Value) -> Result<CrsCode> {
    let name = member
        .get("properties")
        .and_then(|p| p.get("name"))
        .and_then(Value::as_str)
        .ok_or_else(|| TilerError::InvalidCrs(format!("unsupported crs member: {}", member)))?;
    Ok(CrsCode::parse(name)?)
}

impl GeoJsonFeatureCollection {
    /// Convert an in-memory collection for writing.
    pub fn from_collection(collection: &FeatureCollection, name: Option<&str>) -> Self {
        Self {
            type_: "FeatureCollection".to_string(),
            name: name.map(str::to_string),
            crs: collection.crs.map(named_crs),
            features: collection
                .iter()
                .map(|feature| GeoJsonFeature {
                    type_: "Feature".to_string(),
                    id: None,
                    properties: Some(feature.properties.clone()),
                    geometry: Some(GeoJsonGeometry::from(&feature.geometry)),
                })
                .collect(),
        }
    }
}

fn feature_from_geojson(feature: &GeoJsonFeature) -> Result<Option<Feature>> {
    let Some(geometry) = &feature.geometry else {
        return Ok(None);
    };
    Ok(Some(Feature {
        geometry: Geometry::try_from(geometry)?,
        properties: feature.properties.clone().unwrap_or_default(),
    }))
}

/// Serialize a collection as a GeoJSON document.
pub fn to_geojson_vec(collection: &FeatureCollection, name: Option<&str>) -> Result<Vec<u8>> {
    let document = GeoJsonFeatureCollection::from_collection(collection, name);
    serde_json::to_vec_pretty(&document).map_err(TilerError::from)
}

/// Decode a GeoJSON document: a FeatureCollection, a single Feature, or a bare geometry.
///
/// Features with `null` geometry are dropped.
pub fn from_geojson_slice(bytes: &[u8]) -> Result<FeatureCollection> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| TilerError::Decode(format!("invalid GeoJSON: {}", e)))?;

    let crs = match value.get("crs") {
        Some(Value::Null) | None => None,
        Some(member) => Some(parse_named_crs(member)?),
    };

    let type_ = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| TilerError::Decode("GeoJSON object has no type".to_string()))?;

    let decode_err = |e: serde_json::Error| TilerError::Decode(format!("invalid GeoJSON: {}", e));

    let features = match type_ {
        "FeatureCollection" => {
            let fc: GeoJsonFeatureCollection =
                serde_json::from_value(value).map_err(decode_err)?;
            fc.features
                .iter()
                .filter_map(|f| feature_from_geojson(f).transpose())
                .collect::<Result<Vec<_>>>()?
        }
        "Feature" => {
            let feature: GeoJsonFeature = serde_json::from_value(value).map_err(decode_err)?;
            feature_from_geojson(&feature)?.into_iter().collect()
        }
        _ => {
            let geometry: GeoJsonGeometry = serde_json::from_value(value).map_err(decode_err)?;
            vec![Feature::new(Geometry::try_from(&geometry)?)]
        }
    };

    Ok(FeatureCollection::with_features(crs, features))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn test_polygon_serialization_shape() {
        let mut fc = FeatureCollection::new(Some(CrsCode::UTM_46N));
        fc.push(
            Feature::new(polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)])
                .with_property("block", "A"),
        );

        let bytes = to_geojson_vec(&fc, Some("Grid_Intersect")).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["name"], "Grid_Intersect");
        assert_eq!(
            value["crs"]["properties"]["name"],
            "urn:ogc:def:crs:EPSG::32646"
        );
        assert_eq!(value["features"][0]["geometry"]["type"], "Polygon");
        assert_eq!(value["features"][0]["properties"]["block"], "A");
        // Closed ring: 3 vertices + closing vertex
        assert_eq!(
            value["features"][0]["geometry"]["coordinates"][0]
                .as_array()
                .unwrap()
                .len(),
            4
        );
    }

    #[test]
    fn test_decode_single_feature_and_bare_geometry() {
        let feature = br#"{"type":"Feature","properties":null,"geometry":{"type":"Point","coordinates":[90.4,23.8,12.0]}}"#;
        let fc = from_geojson_slice(feature).unwrap();
        assert_eq!(fc.len(), 1);
        assert!(fc.crs.is_none());
        assert!(fc.features[0].properties.is_empty());

        let bare = br#"{"type":"LineString","coordinates":[[0,0],[1,1]]}"#;
        let fc = from_geojson_slice(bare).unwrap();
        assert!(matches!(fc.features[0].geometry, Geometry::LineString(_)));
    }

    #[test]
    fn test_null_geometry_dropped() {
        let doc = br#"{"type":"FeatureCollection","features":[{"type":"Feature","properties":{},"geometry":null}]}"#;
        let fc = from_geojson_slice(doc).unwrap();
        assert!(fc.is_empty());
    }

    #[test]
    fn test_invalid_documents() {
        assert!(matches!(
            from_geojson_slice(b"not json"),
            Err(TilerError::Decode(_))
        ));
        assert!(matches!(
            from_geojson_slice(br#"{"features":[]}"#),
            Err(TilerError::Decode(_))
        ));
        assert!(matches!(
            from_geojson_slice(br#"{"type":"Point","coordinates":[1]}"#),
            Err(TilerError::Decode(_))
        ));
        assert!(matches!(
            from_geojson_slice(
                br#"{"type":"FeatureCollection","crs":{"type":"name","properties":{"name":"EPSG:2193"}},"features":[]}"#
            ),
            Err(TilerError::InvalidCrs(_))
        ));
    }
}
