//! Well-known text.

use geo::Geometry;
use geozero::wkt::WktStr;
use geozero::{ToGeo, ToWkt};

use crate::error::{CartoError, Result};

/// Parse one WKT geometry.
pub fn read_wkt(text: &str) -> Result<Geometry> {
    let text = text.trim();
    if text.is_empty() {
        return Err(CartoError::Parse("empty WKT string".to_string()));
    }
    WktStr(text)
        .to_geo()
        .map_err(|err| CartoError::Parse(format!("invalid WKT: {}", err)))
}

pub fn write_wkt(geometry: &Geometry) -> Result<String> {
    Ok(geometry.to_wkt()?)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test::polygon;
    use geo::point;

    #[test]
    fn parse_polygon() {
        let geometry = read_wkt("POLYGON((0 0, 0 1, 1 1, 1 0, 0 0))").unwrap();
        assert_eq!(geometry, Geometry::Polygon(polygon::unit_square()));
    }

    #[test]
    fn round_trip() {
        for geometry in [
            Geometry::Point(point!(x: 1.5, y: -2.)),
            Geometry::Polygon(polygon::square_with_hole()),
            Geometry::MultiPolygon(polygon::two_squares()),
        ] {
            let text = write_wkt(&geometry).unwrap();
            assert_eq!(read_wkt(&text).unwrap(), geometry);
        }
    }

    #[test]
    fn garbage_is_parse_error() {
        for text in ["", "   ", "not a geometry", "POLYGON((0 0, 1"] {
            let err = read_wkt(text).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Parse);
        }
    }
}
