use geo::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::crs::Crs;
use crate::error::{CartoError, Result};
use crate::table::{AttributeValue, GeometryTable, TableBuilder};

/// A geometry element whose closing tag has not been seen yet.
enum Partial {
    Point(Option<Coord>),
    LineString(Vec<Coord>),
    LinearRing(Vec<Coord>),
    Polygon {
        exterior: Option<LineString>,
        interiors: Vec<LineString>,
    },
    Multi(Vec<Geometry>),
}

impl Partial {
    fn start(name: &[u8]) -> Option<Self> {
        match name {
            b"Point" => Some(Partial::Point(None)),
            b"LineString" => Some(Partial::LineString(Vec::new())),
            b"LinearRing" => Some(Partial::LinearRing(Vec::new())),
            b"Polygon" => Some(Partial::Polygon {
                exterior: None,
                interiors: Vec::new(),
            }),
            b"MultiGeometry" => Some(Partial::Multi(Vec::new())),
            _ => None,
        }
    }

    fn set_coordinates(&mut self, coords: Vec<Coord>) {
        match self {
            Partial::Point(point) => *point = coords.into_iter().next(),
            Partial::LineString(line) | Partial::LinearRing(line) => *line = coords,
            Partial::Polygon { .. } | Partial::Multi(_) => {}
        }
    }

    fn finish(self) -> Result<Geometry> {
        match self {
            Partial::Point(Some(coord)) => Ok(Geometry::Point(Point(coord))),
            Partial::Point(None) => Err(CartoError::Parse(
                "KML Point without coordinates".to_string(),
            )),
            Partial::LineString(coords) | Partial::LinearRing(coords) => {
                Ok(Geometry::LineString(LineString::new(coords)))
            }
            Partial::Polygon {
                exterior: Some(exterior),
                interiors,
            } => Ok(Geometry::Polygon(Polygon::new(exterior, interiors))),
            Partial::Polygon { exterior: None, .. } => Err(CartoError::Parse(
                "KML Polygon without outerBoundaryIs".to_string(),
            )),
            Partial::Multi(parts) => Ok(collect_multi(parts)),
        }
    }
}

/// The most specific geometry type that holds all parts of a MultiGeometry.
fn collect_multi(parts: Vec<Geometry>) -> Geometry {
    if !parts.is_empty() && parts.iter().all(|g| matches!(g, Geometry::Point(_))) {
        let points = parts
            .into_iter()
            .filter_map(|g| Point::try_from(g).ok())
            .collect::<Vec<_>>();
        Geometry::MultiPoint(MultiPoint::new(points))
    } else if !parts.is_empty() && parts.iter().all(|g| matches!(g, Geometry::LineString(_))) {
        let lines = parts
            .into_iter()
            .filter_map(|g| LineString::try_from(g).ok())
            .collect::<Vec<_>>();
        Geometry::MultiLineString(MultiLineString::new(lines))
    } else if !parts.is_empty() && parts.iter().all(|g| matches!(g, Geometry::Polygon(_))) {
        let polygons = parts
            .into_iter()
            .filter_map(|g| Polygon::try_from(g).ok())
            .collect::<Vec<_>>();
        Geometry::MultiPolygon(MultiPolygon::new(polygons))
    } else {
        Geometry::GeometryCollection(GeometryCollection::new_from(parts))
    }
}

/// `lon,lat[,alt]` tuples separated by whitespace.
fn parse_coordinates(text: &str) -> Result<Vec<Coord>> {
    text.split_whitespace()
        .map(|tuple| {
            let mut values = tuple.split(',').map(|v| v.trim().parse::<f64>());
            match (values.next(), values.next()) {
                (Some(Ok(x)), Some(Ok(y))) => Ok(Coord { x, y }),
                _ => Err(CartoError::Parse(format!(
                    "invalid KML coordinate tuple: {}",
                    tuple
                ))),
            }
        })
        .collect()
}

fn name_attribute(element: &BytesStart) -> Result<Option<String>> {
    for attribute in element.attributes() {
        let attribute = attribute
            .map_err(|err| CartoError::Parse(format!("invalid KML attribute: {}", err)))?;
        if attribute.key.local_name().as_ref() == b"name" {
            let value = attribute
                .unescape_value()
                .map_err(|err| CartoError::Parse(format!("invalid KML attribute: {}", err)))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

#[derive(Default)]
struct Placemark {
    attributes: Vec<(String, AttributeValue)>,
    geometry: Option<Geometry>,
}

impl Placemark {
    fn set_attribute(&mut self, name: String, value: String) {
        if !self.attributes.iter().any(|(existing, _)| *existing == name) {
            self.attributes.push((name, AttributeValue::String(value)));
        }
    }
}

/// Read every Placemark of a KML document into one row.
///
/// `name`, `description` and `ExtendedData` (`Data` and `SchemaData` values) become string
/// attributes. KML is always WGS84. Placemarks without a geometry are kept as rows with a null
/// geometry.
pub fn read_kml(text: &str) -> Result<GeometryTable> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut builder = TableBuilder::new(Crs::wgs84());
    // Local names of all open elements
    let mut elements: Vec<Vec<u8>> = Vec::new();
    let mut partials: Vec<Partial> = Vec::new();
    let mut placemark: Option<Placemark> = None;
    let mut data_name: Option<String> = None;
    let mut text_buffer = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(element) => {
                let local = element.local_name().as_ref().to_vec();
                match local.as_slice() {
                    b"Placemark" => placemark = Some(Placemark::default()),
                    b"Data" | b"SimpleData" => data_name = name_attribute(&element)?,
                    name => {
                        if let Some(partial) = Partial::start(name) {
                            partials.push(partial);
                        }
                    }
                }
                text_buffer.clear();
                elements.push(local);
            }
            Event::Text(content) => {
                let content = content
                    .unescape()
                    .map_err(|err| CartoError::Parse(format!("invalid KML text: {}", err)))?;
                text_buffer.push_str(&content);
            }
            Event::CData(content) => {
                text_buffer.push_str(&String::from_utf8_lossy(&content));
            }
            Event::End(_) => {
                let Some(local) = elements.pop() else {
                    continue;
                };
                let parent = elements.last().map(Vec::as_slice);
                let text = std::mem::take(&mut text_buffer);

                match local.as_slice() {
                    b"coordinates" => {
                        if let Some(partial) = partials.last_mut() {
                            partial.set_coordinates(parse_coordinates(&text)?);
                        }
                    }
                    b"name" | b"description" if parent == Some(b"Placemark".as_slice()) => {
                        if let Some(placemark) = placemark.as_mut() {
                            let key = String::from_utf8_lossy(&local).into_owned();
                            placemark.set_attribute(key, text);
                        }
                    }
                    b"value" if parent == Some(b"Data".as_slice()) => {
                        if let (Some(placemark), Some(name)) =
                            (placemark.as_mut(), data_name.clone())
                        {
                            placemark.set_attribute(name, text);
                        }
                    }
                    b"SimpleData" => {
                        if let (Some(placemark), Some(name)) =
                            (placemark.as_mut(), data_name.take())
                        {
                            placemark.set_attribute(name, text);
                        }
                    }
                    b"LinearRing" => {
                        let Some(Partial::LinearRing(coords)) = partials.pop() else {
                            continue;
                        };
                        let ring = LineString::new(coords);
                        if let Some(Partial::Polygon {
                            exterior,
                            interiors,
                        }) = partials.last_mut()
                        {
                            match parent {
                                Some(b"outerBoundaryIs") => *exterior = Some(ring),
                                Some(b"innerBoundaryIs") => interiors.push(ring),
                                _ => {}
                            }
                        } else if let Some(Partial::Multi(parts)) = partials.last_mut() {
                            parts.push(Geometry::LineString(ring));
                        } else if let Some(placemark) = placemark.as_mut() {
                            placemark.geometry = Some(Geometry::LineString(ring));
                        }
                    }
                    b"Point" | b"LineString" | b"Polygon" | b"MultiGeometry" => {
                        let Some(partial) = partials.pop() else {
                            continue;
                        };
                        let geometry = partial.finish()?;
                        if let Some(Partial::Multi(parts)) = partials.last_mut() {
                            parts.push(geometry);
                        } else if let Some(placemark) = placemark.as_mut() {
                            placemark.geometry = Some(geometry);
                        }
                    }
                    b"Data" => data_name = None,
                    b"Placemark" => {
                        if let Some(done) = placemark.take() {
                            builder.push_row(done.geometry, done.attributes);
                        }
                        partials.clear();
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let table = builder.finish()?;
    tracing::debug!(rows = table.len(), "Read KML placemarks");
    Ok(table)
}
