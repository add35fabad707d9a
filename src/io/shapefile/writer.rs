use std::fs;
use std::path::{Path, PathBuf};

use arrow_schema::DataType;
use dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use geo::orient::{Direction, Orient};
use geo::{Coord, Geometry, LineString};
use shapefile::record::EsriShape;
use shapefile::{Multipoint, PolygonRing, Polyline};

use crate::crs::Crs;
use crate::error::{CartoError, Result};
use crate::table::{AttributeValue, GeometryKind, GeometryTable};

/// Name of the feature id column added to every written `.dbf`.
pub const FID_FIELD: &str = "FID";

const MAX_FIELD_NAME_LEN: usize = 10;

const MAX_CHARACTER_LEN: usize = 254;

/// Paths of the sidecar files written for one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapefileFiles {
    pub shp: PathBuf,
    pub shx: PathBuf,
    pub dbf: PathBuf,
    pub prj: Option<PathBuf>,
}

impl ShapefileFiles {
    fn new(dir: &Path, stem: &str) -> Self {
        Self {
            shp: dir.join(format!("{}.shp", stem)),
            shx: dir.join(format!("{}.shx", stem)),
            dbf: dir.join(format!("{}.dbf", stem)),
            prj: None,
        }
    }

    /// Every file that exists for this layer.
    pub fn paths(&self) -> Vec<&Path> {
        let mut paths = vec![self.shp.as_path(), self.shx.as_path(), self.dbf.as_path()];
        if let Some(prj) = &self.prj {
            paths.push(prj.as_path());
        }
        paths
    }
}

/// The shape type shared by every record of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Point,
    Multipoint,
    Polyline,
    Polygon,
}

impl Family {
    fn of(table: &GeometryTable) -> Result<Self> {
        let mut family: Option<Family> = None;
        for kind in table.kinds() {
            let next = match kind {
                GeometryKind::Point => Family::Point,
                GeometryKind::MultiPoint => Family::Multipoint,
                GeometryKind::LineString | GeometryKind::MultiLineString => Family::Polyline,
                GeometryKind::Polygon | GeometryKind::MultiPolygon => Family::Polygon,
                GeometryKind::GeometryCollection => {
                    return Err(CartoError::Export(
                        "a Shapefile cannot hold a GeometryCollection".to_string(),
                    ))
                }
            };
            family = match (family, next) {
                (None, next) => Some(next),
                (Some(current), next) if current == next => Some(current),
                (Some(Family::Point), Family::Multipoint)
                | (Some(Family::Multipoint), Family::Point) => Some(Family::Multipoint),
                (Some(current), next) => {
                    return Err(CartoError::Export(format!(
                        "a Shapefile layer holds one shape type, found {:?} and {:?}",
                        current, next
                    )))
                }
            };
        }
        family.ok_or_else(|| CartoError::Export("no geometries to write".to_string()))
    }
}

fn to_points(coords: impl Iterator<Item = Coord>) -> Vec<shapefile::Point> {
    coords.map(|c| shapefile::Point::new(c.x, c.y)).collect()
}

fn line_part(line: &LineString) -> Result<Vec<shapefile::Point>> {
    if line.0.len() < 2 {
        return Err(CartoError::Export(
            "a Shapefile line needs at least two points".to_string(),
        ));
    }
    Ok(to_points(line.coords().copied()))
}

fn ring(line: &LineString) -> Result<Vec<shapefile::Point>> {
    if line.0.len() < 4 {
        return Err(CartoError::Export(
            "a Shapefile ring needs at least four points".to_string(),
        ));
    }
    Ok(to_points(line.coords().copied()))
}

/// Shapefiles tell outer from inner rings by winding: outer rings run clockwise.
fn polygon_rings(polygon: &geo::Polygon) -> Result<Vec<PolygonRing<shapefile::Point>>> {
    let polygon = polygon.orient(Direction::Reversed);
    let mut rings = vec![PolygonRing::Outer(ring(polygon.exterior())?)];
    for interior in polygon.interiors() {
        rings.push(PolygonRing::Inner(ring(interior)?));
    }
    Ok(rings)
}

fn to_multipoint(geometry: &Geometry) -> Multipoint {
    let points = match geometry {
        Geometry::Point(point) => vec![shapefile::Point::new(point.x(), point.y())],
        Geometry::MultiPoint(points) => to_points(points.iter().map(|p| p.0)),
        _ => Vec::new(),
    };
    Multipoint::new(points)
}

fn to_polyline(geometry: &Geometry) -> Result<Polyline> {
    let parts = match geometry {
        Geometry::Line(line) => vec![line_part(&LineString::new(vec![line.start, line.end]))?],
        Geometry::LineString(line) => vec![line_part(line)?],
        Geometry::MultiLineString(lines) => {
            lines.iter().map(line_part).collect::<Result<Vec<_>>>()?
        }
        _ => return Err(CartoError::Export("expected a line".to_string())),
    };
    Ok(Polyline::with_parts(parts))
}

fn to_polygon(geometry: &Geometry) -> Result<shapefile::Polygon> {
    let rings = match geometry {
        Geometry::Polygon(polygon) => polygon_rings(polygon)?,
        Geometry::Rect(rect) => polygon_rings(&rect.to_polygon())?,
        Geometry::Triangle(triangle) => polygon_rings(&triangle.to_polygon())?,
        Geometry::MultiPolygon(polygons) => {
            let mut rings = Vec::new();
            for polygon in polygons {
                rings.extend(polygon_rings(polygon)?);
            }
            rings
        }
        _ => return Err(CartoError::Export("expected a polygon".to_string())),
    };
    Ok(shapefile::Polygon::with_rings(rings))
}

/// dBase field names are at most ten ASCII characters and must be unique.
fn field_names(columns: &[&str]) -> Vec<String> {
    let mut used = vec![FID_FIELD.to_string()];
    columns
        .iter()
        .map(|column| {
            let base: String = column
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
                .take(MAX_FIELD_NAME_LEN)
                .collect();
            let base = if base.is_empty() {
                "FIELD".to_string()
            } else {
                base
            };

            let mut candidate = base.clone();
            let mut n = 1;
            while used.iter().any(|u| u.eq_ignore_ascii_case(&candidate)) {
                let suffix = n.to_string();
                let keep = base.len().min(MAX_FIELD_NAME_LEN - suffix.len());
                candidate = format!("{}{}", &base[..keep], suffix);
                n += 1;
            }
            used.push(candidate.clone());
            candidate
        })
        .collect()
}

fn field_name(name: &str) -> Result<FieldName> {
    FieldName::try_from(name)
        .map_err(|_| CartoError::Export(format!("invalid dBase field name {:?}", name)))
}

fn truncate(value: String) -> String {
    if value.len() <= MAX_CHARACTER_LEN {
        return value;
    }
    let mut end = MAX_CHARACTER_LEN;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_string()
}

fn write_layer<S: EsriShape>(
    path: &Path,
    table_builder: TableWriterBuilder,
    shapes: Vec<S>,
    records: Vec<Record>,
) -> Result<()> {
    let mut writer = shapefile::Writer::from_path(path, table_builder)?;
    for (shape, record) in shapes.iter().zip(records.iter()) {
        writer.write_shape_and_record(shape, record)?;
    }
    Ok(())
}

/// Write the rows of `table` that have a geometry as `<stem>.shp/.shx/.dbf` inside `dir`.
///
/// All geometries must belong to one family (points, lines or polygons); points and multipoints
/// together are written as multipoints. A `.prj` is added when the CRS has a known definition.
/// The `.dbf` always starts with a numeric [`FID_FIELD`] counting from zero.
pub fn write_shapefile(table: &GeometryTable, dir: &Path, stem: &str) -> Result<ShapefileFiles> {
    let family = Family::of(table)?;
    let mut files = ShapefileFiles::new(dir, stem);

    // Attribute columns, minus a previous FID which is regenerated
    let columns: Vec<(usize, &str)> = table
        .column_names()
        .into_iter()
        .enumerate()
        .filter(|(_, name)| !name.eq_ignore_ascii_case(FID_FIELD))
        .collect();
    let names = field_names(&columns.iter().map(|(_, name)| *name).collect::<Vec<_>>());

    let schema = table.attributes().schema();
    let mut table_builder =
        TableWriterBuilder::new().add_numeric_field(field_name(FID_FIELD)?, 10, 0);
    for ((index, _), name) in columns.iter().zip(&names) {
        let name = field_name(name)?;
        table_builder = match schema.field(*index).data_type() {
            DataType::Boolean => table_builder.add_logical_field(name),
            DataType::Int64 => table_builder.add_numeric_field(name, 19, 0),
            DataType::Float64 => table_builder.add_numeric_field(name, 24, 8),
            _ => table_builder.add_character_field(name, MAX_CHARACTER_LEN as u8),
        };
    }

    let mut records = Vec::new();
    let mut geometries = Vec::new();
    for (row, maybe_geometry) in table.geometries().iter().enumerate() {
        let Some(geometry) = maybe_geometry else {
            continue;
        };
        let mut record = Record::default();
        record.insert(
            FID_FIELD.to_string(),
            FieldValue::Numeric(Some(records.len() as f64)),
        );
        for ((index, _), name) in columns.iter().zip(&names) {
            let value = match (schema.field(*index).data_type(), table.attribute(row, *index)) {
                (DataType::Boolean, Some(AttributeValue::Bool(v))) => {
                    FieldValue::Logical(Some(v))
                }
                (DataType::Boolean, _) => FieldValue::Logical(None),
                (DataType::Int64, Some(AttributeValue::Int(v))) => {
                    FieldValue::Numeric(Some(v as f64))
                }
                (DataType::Float64, Some(AttributeValue::Float(v))) => {
                    FieldValue::Numeric(Some(v))
                }
                (DataType::Int64 | DataType::Float64, _) => FieldValue::Numeric(None),
                (_, value) => FieldValue::Character(value.map(|v| truncate(v.to_string()))),
            };
            record.insert(name.clone(), value);
        }
        records.push(record);
        geometries.push(geometry);
    }

    match family {
        Family::Point => {
            let shapes = geometries
                .iter()
                .filter_map(|g| match g {
                    Geometry::Point(p) => Some(shapefile::Point::new(p.x(), p.y())),
                    _ => None,
                })
                .collect();
            write_layer::<shapefile::Point>(&files.shp, table_builder, shapes, records)?
        }
        Family::Multipoint => {
            let shapes = geometries.iter().map(|g| to_multipoint(g)).collect();
            write_layer::<Multipoint>(&files.shp, table_builder, shapes, records)?
        }
        Family::Polyline => {
            let shapes = geometries
                .iter()
                .map(|g| to_polyline(g))
                .collect::<Result<_>>()?;
            write_layer::<Polyline>(&files.shp, table_builder, shapes, records)?
        }
        Family::Polygon => {
            let shapes = geometries
                .iter()
                .map(|g| to_polygon(g))
                .collect::<Result<_>>()?;
            write_layer::<shapefile::Polygon>(&files.shp, table_builder, shapes, records)?
        }
    }

    let prj = match table.crs() {
        Crs::Other(definition) => Some(definition.as_str()),
        crs => crs.to_prj(),
    };
    match prj {
        Some(prj) => {
            let path = dir.join(format!("{}.prj", stem));
            fs::write(&path, prj)?;
            files.prj = Some(path);
        }
        None => tracing::warn!(crs = %table.crs(), "No .prj definition known, omitting it"),
    }

    tracing::debug!(dir = %dir.display(), ?family, rows = geometries.len(), "Wrote Shapefile");
    Ok(files)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::io::shapefile::read_shapefile;
    use crate::test::table;
    use std::fs::File;
    use std::io::BufReader;

    fn read_back(files: &ShapefileFiles) -> GeometryTable {
        let shp = BufReader::new(File::open(&files.shp).unwrap());
        let dbf = BufReader::new(File::open(&files.dbf).unwrap());
        let prj = fs::read_to_string(files.prj.as_ref().unwrap()).unwrap();
        read_shapefile(shp, Some(dbf), Crs::from_prj(&prj)).unwrap()
    }

    #[test]
    fn points_with_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_shapefile(&table::points(), dir.path(), "output").unwrap();
        assert_eq!(files.paths().len(), 4);
        for path in files.paths() {
            assert!(path.exists());
        }

        let back = read_back(&files);
        assert_eq!(back.len(), 3);
        assert_eq!(back.crs(), &Crs::wgs84());
        assert_eq!(back.geometries(), table::points().geometries());
        assert_eq!(back.column_names(), vec!["FID", "name"]);
        assert_eq!(back.attribute(2, 0), Some(AttributeValue::Float(2.)));
        assert_eq!(
            back.attribute(2, 1),
            Some(AttributeValue::String("p2".to_string()))
        );
    }

    #[test]
    fn polygons_keep_holes() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_shapefile(&table::polygons(), dir.path(), "output").unwrap();
        let back = read_back(&files);
        assert_eq!(
            back.kinds(),
            vec![
                GeometryKind::Polygon,
                GeometryKind::MultiPolygon,
                GeometryKind::Polygon
            ]
        );
        let Some(Geometry::Polygon(holey)) = back.geometry(2) else {
            panic!("expected a polygon");
        };
        assert_eq!(holey.interiors().len(), 1);
        assert_eq!(back.attribute(1, 2), Some(AttributeValue::Float(2.)));
    }

    #[test]
    fn mixed_families_rejected() {
        let mut builder = crate::table::TableBuilder::new(Crs::wgs84());
        builder.push_geometry(Some(geo::point!(x: 0., y: 0.).into()));
        builder.push_geometry(Some(crate::test::polygon::unit_square().into()));
        let table = builder.finish().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let err = write_shapefile(&table, dir.path(), "output").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Export);
    }

    #[test]
    fn dbase_field_names() {
        assert_eq!(
            field_names(&["population_2020", "population_2021", "fid", "名前"]),
            vec!["population", "populatio1", "fid1", "FIELD"]
        );
    }
}
