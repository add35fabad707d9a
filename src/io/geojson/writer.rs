use std::io::Write;

use geozero::geojson::GeoJsonWriter;

use crate::error::Result;
use crate::table::data_source::process_table;
use crate::table::GeometryTable;

/// Write a table as one FeatureCollection.
///
/// Note: does not reproject to WGS84 for you.
pub fn write_geojson<W: Write>(table: &GeometryTable, writer: W) -> Result<()> {
    let mut geojson = GeoJsonWriter::new(writer);
    process_table(table, &mut geojson)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crs::Crs;
    use crate::io::geojson::read_geojson;
    use crate::table::GeometryKind;
    use crate::test::{polygon, table};
    use geo::Geometry;

    #[test]
    fn unit_square_round_trip() {
        let square = polygon::unit_square();
        let table = GeometryTable::single(square.clone().into(), Crs::wgs84()).unwrap();

        let mut output = Vec::new();
        write_geojson(&table, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();

        let back = read_geojson(&text).unwrap();
        assert_eq!(back.len(), 1);
        let Some(Geometry::Polygon(polygon)) = back.geometry(0) else {
            panic!("expected a polygon");
        };
        assert_eq!(polygon.exterior().0.len(), 5);
        assert_eq!(polygon.exterior(), square.exterior());
    }

    #[test]
    fn attributes_survive() {
        let table = table::polygons();
        let mut output = Vec::new();
        write_geojson(&table, &mut output).unwrap();

        let back = read_geojson(std::str::from_utf8(&output).unwrap()).unwrap();
        assert_eq!(back.len(), 3);
        assert_eq!(back.column_names(), table.column_names());
        assert_eq!(
            back.kinds(),
            vec![
                GeometryKind::Polygon,
                GeometryKind::MultiPolygon,
                GeometryKind::Polygon
            ]
        );
        assert_eq!(back.attribute(2, 0), table.attribute(2, 0));
    }
}
