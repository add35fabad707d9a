use std::io::{Cursor, Read, Seek};

use dbase::{FieldInfo, FieldValue, Record};
use geo::{
    Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon,
};
use serde::{Deserialize, Serialize};
use shapefile::{PolygonRing, Shape, ShapeReader};

use crate::crs::Crs;
use crate::error::{CartoError, Result};
use crate::table::{AttributeValue, GeometryTable, TableBuilder};

/// Options for the Shapefile reader.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapefileReaderOptions {
    /// The CRS to assign to the table. When unset it is read from the `.prj` sidecar, and a
    /// layer without one is assumed to be WGS84.
    pub crs: Option<Crs>,
}

/// The sidecar files of one layer, held in memory.
#[derive(Debug, Clone, Default)]
pub struct ShapefileBundle {
    pub shp: Vec<u8>,
    pub dbf: Option<Vec<u8>>,
    pub prj: Option<String>,
}

impl ShapefileBundle {
    /// Collect the first layer found in a zip archive.
    ///
    /// Directory structure inside the archive is ignored, as are macOS resource forks.
    pub fn from_zip(bytes: &[u8]) -> Result<Self> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;

        let mut names = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let name = archive.by_index(i)?.name().to_string();
            if !name.starts_with("__MACOSX") && !name.ends_with('/') {
                names.push(name);
            }
        }

        let shp_name = names
            .iter()
            .find(|name| name.to_ascii_lowercase().ends_with(".shp"))
            .ok_or_else(|| CartoError::Parse("zip archive contains no .shp file".to_string()))?
            .clone();
        let stem = &shp_name[..shp_name.len() - ".shp".len()];
        let sidecar = |extension: &str| {
            names
                .iter()
                .find(|name| {
                    name.len() == stem.len() + extension.len()
                        && name.starts_with(stem)
                        && name[stem.len()..].eq_ignore_ascii_case(extension)
                })
                .cloned()
        };
        let dbf_name = sidecar(".dbf");
        let prj_name = sidecar(".prj");

        let mut read = |name: &str| -> Result<Vec<u8>> {
            let mut file = archive.by_name(name)?;
            let mut buf = Vec::new();
            file.read_to_end(&mut buf)?;
            Ok(buf)
        };

        let shp = read(&shp_name)?;
        let dbf = dbf_name.map(|name| read(&name)).transpose()?;
        let prj = prj_name
            .map(|name| read(&name))
            .transpose()?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned());
        tracing::debug!(
            shp = %shp_name,
            has_dbf = dbf.is_some(),
            has_prj = prj.is_some(),
            "Unpacked Shapefile bundle"
        );

        Ok(Self { shp, dbf, prj })
    }

    pub fn read(self, options: &ShapefileReaderOptions) -> Result<GeometryTable> {
        let crs = match (&options.crs, &self.prj) {
            (Some(crs), _) => crs.clone(),
            (None, Some(prj)) => Crs::from_prj(prj),
            (None, None) => Crs::wgs84(),
        };
        let dbf = self.dbf.map(Cursor::new);
        let table = read_shapefile(Cursor::new(self.shp), dbf, crs)?;
        tracing::info!(rows = table.len(), crs = %table.crs(), "Read Shapefile");
        Ok(table)
    }
}

/// Read a zipped Shapefile bundle.
pub fn read_shapefile_zip(
    bytes: &[u8],
    options: &ShapefileReaderOptions,
) -> Result<GeometryTable> {
    ShapefileBundle::from_zip(bytes)?.read(options)
}

/// Read a Shapefile into a [`GeometryTable`] tagged with `crs`.
///
/// Without a `.dbf` the table has no attribute columns.
pub fn read_shapefile<T: Read + Seek>(
    shp_reader: T,
    dbf_reader: Option<T>,
    crs: Crs,
) -> Result<GeometryTable> {
    let shp_reader = ShapeReader::new(shp_reader)?;
    let mut builder = TableBuilder::new(crs);

    match dbf_reader {
        Some(dbf_reader) => {
            let dbf_reader = dbase::Reader::new(dbf_reader)?;
            let dbf_fields = dbf_reader.fields().to_vec();
            let mut reader = shapefile::Reader::new(shp_reader, dbf_reader);
            for shape_and_record in reader.iter_shapes_and_records() {
                let (shape, record) = shape_and_record?;
                let attributes = record_attributes(&record, &dbf_fields);
                builder.push_row(shape_to_geometry(shape)?, attributes);
            }
        }
        None => {
            for shape in shp_reader.read()? {
                builder.push_geometry(shape_to_geometry(shape)?);
            }
        }
    }

    builder.finish()
}

fn record_attributes<'a>(
    record: &Record,
    fields: &'a [FieldInfo],
) -> Vec<(&'a str, AttributeValue)> {
    fields
        .iter()
        .filter_map(|field| {
            let value = field_value(record.get(field.name())?)?;
            Some((field.name(), value))
        })
        .collect()
}

fn field_value(value: &FieldValue) -> Option<AttributeValue> {
    match value {
        FieldValue::Character(v) => v
            .as_ref()
            .map(|s| AttributeValue::String(s.trim_end().to_string())),
        FieldValue::Memo(v) => Some(AttributeValue::String(v.clone())),
        FieldValue::Numeric(v) => v.map(AttributeValue::Float),
        FieldValue::Float(v) => v.map(|v| AttributeValue::Float(v as f64)),
        FieldValue::Currency(v) | FieldValue::Double(v) => Some(AttributeValue::Float(*v)),
        FieldValue::Integer(v) => Some(AttributeValue::Int(*v as i64)),
        FieldValue::Logical(v) => v.map(AttributeValue::Bool),
        FieldValue::Date(v) => v.as_ref().map(|date| {
            AttributeValue::String(format!(
                "{:04}-{:02}-{:02}",
                date.year(),
                date.month(),
                date.day()
            ))
        }),
        FieldValue::DateTime(v) => Some(AttributeValue::Int(v.to_unix_timestamp())),
    }
}

macro_rules! coords {
    ($points:expr) => {
        $points
            .iter()
            .map(|p| Coord { x: p.x, y: p.y })
            .collect::<Vec<_>>()
    };
}

macro_rules! polyline_to_geometry {
    ($polyline:expr) => {{
        let mut lines: Vec<LineString> = $polyline
            .parts()
            .iter()
            .map(|part| LineString::new(coords!(part)))
            .collect();
        if lines.len() == 1 {
            lines.pop().map(Geometry::LineString)
        } else {
            Some(Geometry::MultiLineString(MultiLineString::new(lines)))
        }
    }};
}

/// Each outer ring starts a new polygon, inner rings belong to the outer ring before them.
macro_rules! polygon_to_geometry {
    ($polygon:expr) => {{
        let mut polygons: Vec<Polygon> = Vec::new();
        for ring in $polygon.rings() {
            match ring {
                PolygonRing::Outer(points) => {
                    polygons.push(Polygon::new(LineString::new(coords!(points)), vec![]));
                }
                PolygonRing::Inner(points) => match polygons.last_mut() {
                    Some(polygon) => polygon.interiors_push(LineString::new(coords!(points))),
                    None => {
                        return Err(CartoError::Parse(
                            "Shapefile polygon has an inner ring before any outer ring".to_string(),
                        ))
                    }
                },
            }
        }
        if polygons.len() == 1 {
            polygons.pop().map(Geometry::Polygon)
        } else {
            Some(Geometry::MultiPolygon(MultiPolygon::new(polygons)))
        }
    }};
}

/// Convert a shape, dropping any Z and M values.
fn shape_to_geometry(shape: Shape) -> Result<Option<Geometry>> {
    let geometry = match shape {
        Shape::NullShape => None,
        Shape::Point(p) => Some(Geometry::Point(Point::new(p.x, p.y))),
        Shape::PointM(p) => Some(Geometry::Point(Point::new(p.x, p.y))),
        Shape::PointZ(p) => Some(Geometry::Point(Point::new(p.x, p.y))),
        Shape::Multipoint(mp) => Some(MultiPoint::from(coords!(mp.points())).into()),
        Shape::MultipointM(mp) => Some(MultiPoint::from(coords!(mp.points())).into()),
        Shape::MultipointZ(mp) => Some(MultiPoint::from(coords!(mp.points())).into()),
        Shape::Polyline(pl) => polyline_to_geometry!(pl),
        Shape::PolylineM(pl) => polyline_to_geometry!(pl),
        Shape::PolylineZ(pl) => polyline_to_geometry!(pl),
        Shape::Polygon(pg) => polygon_to_geometry!(pg),
        Shape::PolygonM(pg) => polygon_to_geometry!(pg),
        Shape::PolygonZ(pg) => polygon_to_geometry!(pg),
        Shape::Multipatch(_) => {
            return Err(CartoError::Parse(
                "Multipatch shapes are not supported".to_string(),
            ))
        }
    };
    Ok(geometry)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn null_shape_has_no_geometry() {
        assert_eq!(shape_to_geometry(Shape::NullShape).unwrap(), None);
    }

    #[test]
    fn polygon_rings_are_grouped() {
        let outer = |x0: f64| {
            PolygonRing::Outer(vec![
                shapefile::Point::new(x0, 0.),
                shapefile::Point::new(x0, 1.),
                shapefile::Point::new(x0 + 1., 1.),
                shapefile::Point::new(x0 + 1., 0.),
                shapefile::Point::new(x0, 0.),
            ])
        };
        let inner = PolygonRing::Inner(vec![
            shapefile::Point::new(0.2, 0.2),
            shapefile::Point::new(0.8, 0.2),
            shapefile::Point::new(0.8, 0.8),
            shapefile::Point::new(0.2, 0.8),
            shapefile::Point::new(0.2, 0.2),
        ]);
        let shape = Shape::Polygon(shapefile::Polygon::with_rings(vec![
            outer(0.),
            inner,
            outer(5.),
        ]));

        let Some(Geometry::MultiPolygon(multi)) = shape_to_geometry(shape).unwrap() else {
            panic!("expected a multipolygon");
        };
        assert_eq!(multi.0.len(), 2);
        assert_eq!(multi.0[0].interiors().len(), 1);
        assert_eq!(multi.0[1].interiors().len(), 0);
    }

    #[test]
    fn single_part_polyline_is_a_line_string() {
        let shape = Shape::Polyline(shapefile::Polyline::new(vec![
            shapefile::Point::new(0., 0.),
            shapefile::Point::new(1., 1.),
        ]));
        assert!(matches!(
            shape_to_geometry(shape).unwrap(),
            Some(Geometry::LineString(_))
        ));
    }

    #[test]
    fn zip_without_shp() {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut cursor);
            zip.start_file("readme.txt", zip::write::FileOptions::default())
                .unwrap();
            std::io::Write::write_all(&mut zip, b"hello").unwrap();
            zip.finish().unwrap();
        }
        let err = read_shapefile_zip(cursor.get_ref(), &Default::default()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Parse);
    }
}
