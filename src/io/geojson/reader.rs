use geojson::{GeoJson, JsonObject};
use geozero::geojson::GeoJsonReader;
use geozero::GeozeroDatasource;

use crate::crs::Crs;
use crate::error::{CartoError, Result};
use crate::table::{GeometryTable, TableBuilder};

/// Read a FeatureCollection, a single Feature or a bare Geometry into a [`GeometryTable`].
///
/// Feature properties become attribute columns. The table is tagged with the CRS named in the
/// legacy `crs` member when one is present, and with WGS84 otherwise.
pub fn read_geojson(text: &str) -> Result<GeometryTable> {
    let document: GeoJson = text
        .parse()
        .map_err(|err| CartoError::Parse(format!("invalid GeoJSON: {}", err)))?;
    let crs = match legacy_crs(&document) {
        Some(name) => name.parse()?,
        None => Crs::wgs84(),
    };

    let mut builder = TableBuilder::new(crs);
    let mut geojson = GeoJsonReader(text.as_bytes());
    geojson.process(&mut builder)?;
    builder.finish()
}

/// `{"crs": {"type": "name", "properties": {"name": "EPSG:3857"}}}`
fn legacy_crs(document: &GeoJson) -> Option<String> {
    let foreign_members: &JsonObject = match document {
        GeoJson::FeatureCollection(fc) => fc.foreign_members.as_ref()?,
        GeoJson::Feature(feature) => feature.foreign_members.as_ref()?,
        GeoJson::Geometry(geometry) => geometry.foreign_members.as_ref()?,
    };
    foreign_members
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ErrorKind;
    use crate::table::{AttributeValue, GeometryKind};
    use geo::{point, Geometry};

    #[test]
    fn feature_collection() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {"name": "a", "population": 12},
                    "geometry": {"type": "Point", "coordinates": [1.0, 2.0]}
                },
                {
                    "type": "Feature",
                    "properties": {"name": "b"},
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[0, 0], [0, 1], [1, 1], [1, 0], [0, 0]]]
                    }
                }
            ]
        }"#;
        let table = read_geojson(text).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.crs(), &Crs::wgs84());
        assert_eq!(table.kinds(), vec![GeometryKind::Point, GeometryKind::Polygon]);
        assert_eq!(table.column_names(), vec!["name", "population"]);
        assert_eq!(table.attribute(0, 1), Some(AttributeValue::Int(12)));
        assert_eq!(table.attribute(1, 1), None);
    }

    #[test]
    fn bare_geometry() {
        let table = read_geojson(r#"{"type": "Point", "coordinates": [3, 4]}"#).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.geometry(0), Some(&Geometry::Point(point!(x: 3., y: 4.))));
    }

    #[test]
    fn legacy_crs_member() {
        let text = r#"{
            "type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::3857"}},
            "features": [
                {
                    "type": "Feature",
                    "properties": {},
                    "geometry": {"type": "Point", "coordinates": [111319.49, 111325.14]}
                }
            ]
        }"#;
        let table = read_geojson(text).unwrap();
        assert_eq!(table.crs(), &Crs::web_mercator());
    }

    #[test]
    fn malformed() {
        let err = read_geojson(r#"{"type": "Feature""#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }
}
