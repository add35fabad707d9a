use geo::{point, Geometry};

use crate::crs::Crs;
use crate::table::{AttributeValue, GeometryTable, TableBuilder};
use crate::test::{point, polygon};

/// Three named points in WGS84.
pub(crate) fn points() -> GeometryTable {
    let mut builder = TableBuilder::new(Crs::wgs84());
    for (name, p) in [("p0", point::p0()), ("p1", point::p1()), ("p2", point::p2())] {
        builder.push_row(
            Some(p.into()),
            [("name", AttributeValue::String(name.to_string()))],
        );
    }
    builder.finish().unwrap()
}

/// One polygon, one multipolygon and one polygon with a hole, with mixed attribute types.
pub(crate) fn polygons() -> GeometryTable {
    let mut builder = TableBuilder::new(Crs::wgs84());
    builder.push_row(
        Some(polygon::unit_square().into()),
        [
            ("name", AttributeValue::String("square".to_string())),
            ("rank", AttributeValue::Int(1)),
        ],
    );
    builder.push_row(
        Some(polygon::two_squares().into()),
        [
            ("name", AttributeValue::String("pair".to_string())),
            ("rank", AttributeValue::Int(2)),
        ],
    );
    builder.push_row(
        Some(polygon::square_with_hole().into()),
        [
            ("name", AttributeValue::String("holey".to_string())),
            ("rank", AttributeValue::Int(3)),
        ],
    );
    builder.finish().unwrap()
}

/// Two points and a row whose geometry could not be parsed.
pub(crate) fn with_null_row() -> GeometryTable {
    let mut builder = TableBuilder::new(Crs::wgs84());
    builder.push_row(
        Some(Geometry::Point(point!(x: 1., y: 1.))),
        [("name", AttributeValue::String("a".to_string()))],
    );
    builder.push_row(None, [("name", AttributeValue::String("b".to_string()))]);
    builder.push_row(
        Some(Geometry::Point(point!(x: 2., y: 2.))),
        [("name", AttributeValue::String("c".to_string()))],
    );
    builder.finish().unwrap()
}
