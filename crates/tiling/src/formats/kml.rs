//! KML reading and writing.
//!
//! KML coordinates are always WGS84 longitude/latitude (EPSG:4326), written
//! as `lon,lat[,alt]` tuples separated by whitespace. Altitude is dropped on
//! read and never written.

use std::borrow::Cow;

use geo::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};
use grid_common::CrsCode;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::Value;

use crate::error::{Result, TilerError};
use crate::feature::{Feature, FeatureCollection, Properties};

const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";

// =============================================================================
// Reading
// =============================================================================

/// Geometry under construction inside a Placemark.
#[derive(Debug, Default)]
struct PolygonBuilder {
    exterior: Option<LineString<f64>>,
    interiors: Vec<LineString<f64>>,
}

/// A Placemark under construction.
#[derive(Debug, Default)]
struct PlacemarkBuilder {
    properties: Properties,
    geometries: Vec<Geometry<f64>>,
    polygon: Option<PolygonBuilder>,
    data_name: Option<String>,
}

impl PlacemarkBuilder {
    fn finish(mut self) -> Option<Feature> {
        let geometry = match self.geometries.len() {
            0 => return None,
            1 => self.geometries.remove(0),
            _ => combine(self.geometries),
        };
        Some(Feature {
            geometry,
            properties: self.properties,
        })
    }
}

/// Merge the members of a MultiGeometry into the tightest multi type.
fn combine(geometries: Vec<Geometry<f64>>) -> Geometry<f64> {
    if geometries.iter().all(|g| matches!(g, Geometry::Polygon(_))) {
        let polygons = geometries
            .into_iter()
            .filter_map(|g| match g {
                Geometry::Polygon(p) => Some(p),
                _ => None,
            })
            .collect();
        return Geometry::MultiPolygon(MultiPolygon::new(polygons));
    }
    if geometries.iter().all(|g| matches!(g, Geometry::LineString(_))) {
        let lines = geometries
            .into_iter()
            .filter_map(|g| match g {
                Geometry::LineString(l) => Some(l),
                _ => None,
            })
            .collect();
        return Geometry::MultiLineString(MultiLineString::new(lines));
    }
    if geometries.iter().all(|g| matches!(g, Geometry::Point(_))) {
        let points = geometries
            .into_iter()
            .filter_map(|g| match g {
                Geometry::Point(p) => Some(p),
                _ => None,
            })
            .collect();
        return Geometry::MultiPoint(MultiPoint::new(points));
    }
    Geometry::GeometryCollection(GeometryCollection::new_from(geometries))
}

/// Parse a `<coordinates>` body.
pub fn parse_coordinates(text: &str) -> Result<Vec<Coord<f64>>> {
    text.split_whitespace()
        .map(|tuple| {
            let mut parts = tuple.split(',');
            let mut next = || -> Result<f64> {
                parts
                    .next()
                    .and_then(|s| s.trim().parse::<f64>().ok())
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| {
                        TilerError::Decode(format!("invalid KML coordinate tuple '{}'", tuple))
                    })
            };
            let x = next()?;
            let y = next()?;
            Ok(Coord { x, y })
        })
        .collect()
}

fn local_name(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn name_attribute(start: &BytesStart<'_>) -> Result<Option<String>> {
    for attr in start.attributes() {
        let attr = attr.map_err(|e| TilerError::Decode(format!("invalid KML attribute: {}", e)))?;
        if attr.key.local_name().as_ref() == b"name" {
            let value = attr
                .unescape_value()
                .map_err(|e| TilerError::Decode(format!("invalid KML attribute: {}", e)))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Decode a KML document into a lon/lat feature collection.
///
/// Every Placemark becomes one feature, wherever it sits in the
/// Document/Folder tree. Placemarks without geometry are skipped.
pub fn from_kml_slice(bytes: &[u8]) -> Result<FeatureCollection> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| TilerError::Decode(format!("KML is not valid UTF-8: {}", e)))?;
    let mut reader = Reader::from_str(text);

    let mut stack: Vec<String> = Vec::new();
    let mut text_buf = String::new();
    let mut placemark: Option<PlacemarkBuilder> = None;
    let mut features = Vec::new();
    let mut saw_kml_root = false;

    loop {
        let event = reader.read_event().map_err(|e| {
            TilerError::Decode(format!(
                "malformed KML at byte {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(start) => {
                let name = local_name(start.local_name().as_ref());
                text_buf.clear();

                match name.as_str() {
                    "kml" => saw_kml_root = true,
                    "Placemark" => placemark = Some(PlacemarkBuilder::default()),
                    "Polygon" => {
                        if let Some(pm) = placemark.as_mut() {
                            pm.polygon = Some(PolygonBuilder::default());
                        }
                    }
                    "Data" => {
                        if let Some(pm) = placemark.as_mut() {
                            pm.data_name = name_attribute(&start)?;
                        }
                    }
                    "SimpleData" => {
                        if let Some(pm) = placemark.as_mut() {
                            pm.data_name = name_attribute(&start)?;
                        }
                    }
                    _ => {}
                }
                stack.push(name);
            }
            Event::Text(t) => {
                let unescaped = t
                    .unescape()
                    .map_err(|e| TilerError::Decode(format!("invalid KML text: {}", e)))?;
                text_buf.push_str(&unescaped);
            }
            Event::CData(c) => {
                text_buf.push_str(&String::from_utf8_lossy(&c.into_inner()));
            }
            Event::End(end) => {
                let name = local_name(end.local_name().as_ref());
                if stack.last() != Some(&name) {
                    return Err(TilerError::Decode(format!(
                        "mismatched KML closing tag </{}>",
                        name
                    )));
                }
                stack.pop();
                let parent = stack.last().map(String::as_str);

                if let Some(pm) = placemark.as_mut() {
                    handle_placemark_end(pm, &name, parent, &stack, &text_buf)?;
                }
                if name == "Placemark" {
                    if let Some(feature) = placemark.take().and_then(PlacemarkBuilder::finish) {
                        features.push(feature);
                    }
                }
                text_buf.clear();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_kml_root {
        return Err(TilerError::Decode("document has no <kml> root element".to_string()));
    }

    Ok(FeatureCollection::with_features(
        Some(CrsCode::Epsg4326),
        features,
    ))
}

fn handle_placemark_end(
    pm: &mut PlacemarkBuilder,
    name: &str,
    parent: Option<&str>,
    stack: &[String],
    text: &str,
) -> Result<()> {
    let inside = |element: &str| stack.iter().any(|s| s == element);

    match name {
        "name" | "description" if parent == Some("Placemark") => {
            pm.properties
                .insert(name.to_string(), Value::String(text.trim().to_string()));
        }
        "value" if parent == Some("Data") => {
            if let Some(key) = pm.data_name.clone() {
                pm.properties
                    .insert(key, Value::String(text.trim().to_string()));
            }
        }
        "SimpleData" => {
            if let Some(key) = pm.data_name.take() {
                pm.properties
                    .insert(key, Value::String(text.trim().to_string()));
            }
        }
        "Data" => pm.data_name = None,
        "coordinates" => {
            let coords = parse_coordinates(text)?;
            if inside("Polygon") {
                if let Some(polygon) = pm.polygon.as_mut() {
                    let ring = LineString::new(coords);
                    if inside("innerBoundaryIs") {
                        polygon.interiors.push(ring);
                    } else {
                        polygon.exterior = Some(ring);
                    }
                }
            } else {
                match parent {
                    Some("Point") => {
                        let coord = coords.first().copied().ok_or_else(|| {
                            TilerError::Decode("KML Point without coordinates".to_string())
                        })?;
                        pm.geometries.push(Geometry::Point(Point(coord)));
                    }
                    Some("LineString") => {
                        pm.geometries
                            .push(Geometry::LineString(LineString::new(coords)));
                    }
                    // A bare LinearRing outside a Polygon is an area without holes
                    Some("LinearRing") => {
                        pm.geometries.push(Geometry::Polygon(Polygon::new(
                            LineString::new(coords),
                            Vec::new(),
                        )));
                    }
                    _ => {}
                }
            }
        }
        "Polygon" => {
            if let Some(builder) = pm.polygon.take() {
                let exterior = builder.exterior.ok_or_else(|| {
                    TilerError::Decode("KML Polygon without outerBoundaryIs".to_string())
                })?;
                pm.geometries
                    .push(Geometry::Polygon(Polygon::new(exterior, builder.interiors)));
            }
        }
        _ => {}
    }
    Ok(())
}

// =============================================================================
// Writing
// =============================================================================

fn xml_err(e: impl std::fmt::Display) -> TilerError {
    TilerError::Internal(format!("KML write failed: {}", e))
}

fn coordinates_text<'a>(coords: impl Iterator<Item = &'a Coord<f64>>) -> String {
    coords
        .map(|c| format!("{},{}", c.x, c.y))
        .collect::<Vec<_>>()
        .join(" ")
}

struct KmlWriter {
    writer: Writer<Vec<u8>>,
}

impl KmlWriter {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<()> {
        self.writer.write_event(event).map_err(xml_err)
    }

    fn start(&mut self, name: &str) -> Result<()> {
        self.event(Event::Start(BytesStart::new(name)))
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn text_element(&mut self, name: &str, text: &str) -> Result<()> {
        self.start(name)?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    fn ring(&mut self, wrapper: &str, ring: &LineString<f64>) -> Result<()> {
        self.start(wrapper)?;
        self.start("LinearRing")?;
        self.text_element("coordinates", &coordinates_text(ring.coords()))?;
        self.end("LinearRing")?;
        self.end(wrapper)
    }

    fn polygon(&mut self, polygon: &Polygon<f64>) -> Result<()> {
        self.start("Polygon")?;
        self.ring("outerBoundaryIs", polygon.exterior())?;
        for interior in polygon.interiors() {
            self.ring("innerBoundaryIs", interior)?;
        }
        self.end("Polygon")
    }

    fn line(&mut self, line: &LineString<f64>) -> Result<()> {
        self.start("LineString")?;
        self.text_element("coordinates", &coordinates_text(line.coords()))?;
        self.end("LineString")
    }

    fn point(&mut self, point: &Point<f64>) -> Result<()> {
        self.start("Point")?;
        self.text_element("coordinates", &coordinates_text(std::iter::once(&point.0)))?;
        self.end("Point")
    }

    fn geometry(&mut self, geometry: &Geometry<f64>) -> Result<()> {
        match geometry {
            Geometry::Point(p) => self.point(p),
            Geometry::Line(l) => self.line(&LineString::new(vec![l.start, l.end])),
            Geometry::LineString(ls) => self.line(ls),
            Geometry::Polygon(p) => self.polygon(p),
            Geometry::Rect(r) => self.polygon(&r.to_polygon()),
            Geometry::Triangle(t) => self.polygon(&t.to_polygon()),
            Geometry::MultiPoint(mp) => {
                self.start("MultiGeometry")?;
                for p in mp.iter() {
                    self.point(p)?;
                }
                self.end("MultiGeometry")
            }
            Geometry::MultiLineString(mls) => {
                self.start("MultiGeometry")?;
                for l in mls.iter() {
                    self.line(l)?;
                }
                self.end("MultiGeometry")
            }
            Geometry::MultiPolygon(mp) => {
                self.start("MultiGeometry")?;
                for p in mp.iter() {
                    self.polygon(p)?;
                }
                self.end("MultiGeometry")
            }
            Geometry::GeometryCollection(gc) => {
                self.start("MultiGeometry")?;
                for g in gc.iter() {
                    self.geometry(g)?;
                }
                self.end("MultiGeometry")
            }
        }
    }

    fn extended_data(&mut self, properties: &Properties) -> Result<()> {
        let data: Vec<(&String, &Value)> = properties
            .iter()
            .filter(|(k, _)| k.as_str() != "name" && k.as_str() != "description")
            .collect();
        if data.is_empty() {
            return Ok(());
        }

        self.start("ExtendedData")?;
        for (key, value) in data {
            let text = match value {
                Value::String(s) => Cow::Borrowed(s.as_str()),
                other => Cow::Owned(other.to_string()),
            };
            self.event(Event::Start(
                BytesStart::new("Data").with_attributes([("name", key.as_str())]),
            ))?;
            self.text_element("value", &text)?;
            self.end("Data")?;
        }
        self.end("ExtendedData")
    }

    fn placemark(&mut self, feature: &Feature, fallback_name: Option<&str>) -> Result<()> {
        self.start("Placemark")?;
        let name = feature
            .properties
            .get("name")
            .and_then(Value::as_str)
            .or(fallback_name);
        if let Some(name) = name {
            self.text_element("name", name)?;
        }
        if let Some(description) = feature.properties.get("description").and_then(Value::as_str)
        {
            self.text_element("description", description)?;
        }
        self.extended_data(&feature.properties)?;
        self.geometry(&feature.geometry)?;
        self.end("Placemark")
    }

    fn finish(self) -> Vec<u8> {
        let mut bytes = self.writer.into_inner();
        bytes.push(b'\n');
        bytes
    }
}

/// Serialize a lon/lat collection as a KML document.
///
/// Placemarks take their name from the `name` property, or
/// `{document_name}_{index}` when there is none.
pub fn to_kml_vec(collection: &FeatureCollection, document_name: &str) -> Result<Vec<u8>> {
    if let Some(crs) = collection.crs {
        if crs != CrsCode::Epsg4326 {
            return Err(TilerError::InvalidCrs(format!(
                "KML requires EPSG:4326 coordinates, got {}",
                crs
            )));
        }
    }

    let mut kml = KmlWriter::new();
    kml.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    kml.event(Event::Start(
        BytesStart::new("kml").with_attributes([("xmlns", KML_NAMESPACE)]),
    ))?;
    kml.start("Document")?;
    kml.text_element("name", document_name)?;

    let single = collection.len() == 1;
    for (index, feature) in collection.iter().enumerate() {
        let fallback = if single {
            document_name.to_string()
        } else {
            format!("{}_{}", document_name, index)
        };
        kml.placemark(feature, Some(&fallback))?;
    }

    kml.end("Document")?;
    kml.end("kml")?;
    Ok(kml.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;
    use test_utils::fixtures;

    #[test]
    fn test_parse_coordinates_drops_altitude() {
        let coords = parse_coordinates(" 90.1,23.5,100\n\t90.2,23.6 ").unwrap();
        assert_eq!(coords, vec![Coord { x: 90.1, y: 23.5 }, Coord { x: 90.2, y: 23.6 }]);
        assert!(parse_coordinates("90.1").is_err());
        assert!(parse_coordinates("abc,1").is_err());
    }

    #[test]
    fn test_read_nested_placemark_with_extended_data() {
        let fc = from_kml_slice(fixtures::DHAKA_AOI_KML.as_bytes()).unwrap();
        assert_eq!(fc.crs, Some(CrsCode::Epsg4326));
        assert_eq!(fc.len(), 1);

        let feature = &fc.features[0];
        assert_eq!(feature.properties["name"], "Block A");
        assert_eq!(feature.properties["description"], "North survey block");
        assert_eq!(feature.properties["owner"], "survey-team");
        assert_eq!(feature.properties["priority"], "1");

        match &feature.geometry {
            Geometry::Polygon(p) => {
                assert_eq!(p.exterior().0.len(), 5);
                assert!(p.interiors().is_empty());
            }
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_read_mixed_geometries() {
        let fc = from_kml_slice(fixtures::MIXED_GEOMETRY_KML.as_bytes()).unwrap();
        assert_eq!(fc.len(), 4);

        match &fc.features[0].geometry {
            Geometry::Polygon(p) => assert_eq!(p.interiors().len(), 1),
            other => panic!("expected holed polygon, got {:?}", other),
        }
        match &fc.features[1].geometry {
            Geometry::MultiPolygon(mp) => assert_eq!(mp.0.len(), 2),
            other => panic!("expected multipolygon, got {:?}", other),
        }
        assert!(matches!(fc.features[2].geometry, Geometry::LineString(_)));
        match &fc.features[3].geometry {
            Geometry::Point(p) => {
                assert_eq!(p.x(), 90.25);
                assert_eq!(p.y(), 22.95);
            }
            other => panic!("expected point, got {:?}", other),
        }
    }

    #[test]
    fn test_document_without_placemarks_is_empty() {
        let fc = from_kml_slice(fixtures::EMPTY_KML.as_bytes()).unwrap();
        assert!(fc.is_empty());
    }

    #[test]
    fn test_malformed_kml_rejected() {
        assert!(matches!(
            from_kml_slice(b"<kml><Document></kml>"),
            Err(TilerError::Decode(_))
        ));
        assert!(matches!(
            from_kml_slice(b"<html><body/></html>"),
            Err(TilerError::Decode(_))
        ));
    }

    #[test]
    fn test_write_single_tile_document() {
        let mut fc = FeatureCollection::new(Some(CrsCode::Epsg4326));
        fc.push(Feature::new(polygon![
            (x: 90.0, y: 23.0),
            (x: 90.5, y: 23.0),
            (x: 90.5, y: 23.5),
        ]));

        let bytes = to_kml_vec(&fc, "Drone_Grid_polygon_0").unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(text.contains("xmlns=\"http://www.opengis.net/kml/2.2\""));
        assert_eq!(text.matches("<Placemark>").count(), 1);
        assert!(text.contains("<name>Drone_Grid_polygon_0</name>"));
        assert!(text.contains("90,23 90.5,23 90.5,23.5 90,23"));
    }

    #[test]
    fn test_write_rejects_projected_collection() {
        let fc = FeatureCollection::new(Some(CrsCode::UTM_46N));
        assert!(matches!(
            to_kml_vec(&fc, "x"),
            Err(TilerError::InvalidCrs(_))
        ));
    }

    #[test]
    fn test_extended_data_round_trip() {
        let mut fc = FeatureCollection::new(Some(CrsCode::Epsg4326));
        fc.push(
            Feature::new(polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)])
                .with_property("name", "Block <B>")
                .with_property("priority", 3),
        );

        let bytes = to_kml_vec(&fc, "doc").unwrap();
        let back = from_kml_slice(&bytes).unwrap();
        assert_eq!(back.features[0].properties["name"], "Block <B>");
        assert_eq!(back.features[0].properties["priority"], "3");
        assert_eq!(back.features[0].geometry, fc.features[0].geometry);
    }
}
