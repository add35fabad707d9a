use std::io::{Cursor, Write};

use geo::{Coord, Geometry, LineString};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::{CartoError, Result};
use crate::io::kml::KML_NAMESPACE;
use crate::table::GeometryTable;

fn emit<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|err| CartoError::Export(format!("failed to write KML: {}", err)))
}

fn start<W: Write>(writer: &mut Writer<W>, name: &str) -> Result<()> {
    emit(writer, Event::Start(BytesStart::new(name)))
}

fn end<W: Write>(writer: &mut Writer<W>, name: &str) -> Result<()> {
    emit(writer, Event::End(BytesEnd::new(name)))
}

fn text_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    start(writer, name)?;
    emit(writer, Event::Text(BytesText::new(text)))?;
    end(writer, name)
}

fn coordinates<W: Write>(
    writer: &mut Writer<W>,
    coords: impl Iterator<Item = Coord>,
) -> Result<()> {
    let text = coords
        .map(|c| format!("{},{}", c.x, c.y))
        .collect::<Vec<_>>()
        .join(" ");
    text_element(writer, "coordinates", &text)
}

fn write_point<W: Write>(writer: &mut Writer<W>, coord: Coord) -> Result<()> {
    start(writer, "Point")?;
    coordinates(writer, std::iter::once(coord))?;
    end(writer, "Point")
}

fn write_line_string<W: Write>(writer: &mut Writer<W>, line: &LineString) -> Result<()> {
    start(writer, "LineString")?;
    coordinates(writer, line.coords().copied())?;
    end(writer, "LineString")
}

/// Only the outer boundary is written.
fn write_polygon<W: Write>(writer: &mut Writer<W>, exterior: &LineString) -> Result<()> {
    start(writer, "Polygon")?;
    start(writer, "outerBoundaryIs")?;
    start(writer, "LinearRing")?;
    coordinates(writer, exterior.coords().copied())?;
    end(writer, "LinearRing")?;
    end(writer, "outerBoundaryIs")?;
    end(writer, "Polygon")
}

fn write_geometry<W: Write>(writer: &mut Writer<W>, geometry: &Geometry) -> Result<()> {
    match geometry {
        Geometry::Point(point) => write_point(writer, point.0),
        Geometry::Line(line) => {
            write_line_string(writer, &LineString::new(vec![line.start, line.end]))
        }
        Geometry::LineString(line) => write_line_string(writer, line),
        Geometry::Polygon(polygon) => write_polygon(writer, polygon.exterior()),
        Geometry::Rect(rect) => write_polygon(writer, rect.to_polygon().exterior()),
        Geometry::Triangle(triangle) => write_polygon(writer, triangle.to_polygon().exterior()),
        Geometry::MultiPoint(points) => {
            start(writer, "MultiGeometry")?;
            for point in points {
                write_point(writer, point.0)?;
            }
            end(writer, "MultiGeometry")
        }
        Geometry::MultiLineString(lines) => {
            start(writer, "MultiGeometry")?;
            for line in lines {
                write_line_string(writer, line)?;
            }
            end(writer, "MultiGeometry")
        }
        Geometry::MultiPolygon(polygons) => {
            start(writer, "MultiGeometry")?;
            for polygon in polygons {
                write_polygon(writer, polygon.exterior())?;
            }
            end(writer, "MultiGeometry")
        }
        Geometry::GeometryCollection(collection) => {
            start(writer, "MultiGeometry")?;
            for part in collection {
                write_geometry(writer, part)?;
            }
            end(writer, "MultiGeometry")
        }
    }
}

/// Write one Placemark per row that has a geometry.
///
/// A `name` attribute becomes the Placemark name; every other attribute is written as
/// `ExtendedData`. Polygons keep their outer boundary only, and multi-part geometries become a
/// `MultiGeometry`. Coordinates are written as they are, so the table should already be in WGS84.
pub fn write_kml(table: &GeometryTable) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;
    let mut kml = BytesStart::new("kml");
    kml.push_attribute(("xmlns", KML_NAMESPACE));
    emit(&mut writer, Event::Start(kml))?;
    start(&mut writer, "Document")?;

    for (row, maybe_geometry) in table.geometries().iter().enumerate() {
        let Some(geometry) = maybe_geometry else {
            continue;
        };
        start(&mut writer, "Placemark")?;

        let attributes = table.row_attributes(row);
        if let Some((_, name)) = attributes.iter().find(|(key, _)| *key == "name") {
            text_element(&mut writer, "name", &name.to_string())?;
        }
        let extended: Vec<_> = attributes
            .iter()
            .filter(|(key, _)| *key != "name")
            .collect();
        if !extended.is_empty() {
            start(&mut writer, "ExtendedData")?;
            for (key, value) in extended {
                let mut data = BytesStart::new("Data");
                data.push_attribute(("name", *key));
                emit(&mut writer, Event::Start(data))?;
                text_element(&mut writer, "value", &value.to_string())?;
                end(&mut writer, "Data")?;
            }
            end(&mut writer, "ExtendedData")?;
        }

        write_geometry(&mut writer, geometry)?;
        end(&mut writer, "Placemark")?;
    }

    end(&mut writer, "Document")?;
    end(&mut writer, "kml")?;
    Ok(writer.into_inner().into_inner())
}
