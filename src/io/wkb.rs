//! Well-known binary, raw or hex encoded.

use geo::Geometry;
use geozero::wkb::Wkb;
use geozero::{CoordDimensions, ToGeo, ToWkb};

use crate::error::{CartoError, Result};

/// Decode a hex string as pasted by a user.
///
/// Whitespace anywhere in the string and a leading `0x` are ignored.
pub fn decode_hex(text: &str) -> Result<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let digits = compact
        .strip_prefix("0x")
        .or_else(|| compact.strip_prefix("0X"))
        .unwrap_or(&compact);
    if digits.is_empty() {
        return Err(CartoError::Parse("empty WKB hex string".to_string()));
    }
    hex::decode(digits).map_err(|err| CartoError::Parse(format!("invalid WKB hex: {}", err)))
}

pub fn read_wkb(bytes: &[u8]) -> Result<Geometry> {
    if bytes.is_empty() {
        return Err(CartoError::Parse("empty WKB".to_string()));
    }
    Wkb(bytes.to_vec())
        .to_geo()
        .map_err(|err| CartoError::Parse(format!("invalid WKB: {}", err)))
}

pub fn read_wkb_hex(text: &str) -> Result<Geometry> {
    read_wkb(&decode_hex(text)?)
}

/// Encode as two-dimensional little-endian WKB.
pub fn write_wkb(geometry: &Geometry) -> Result<Vec<u8>> {
    Ok(geometry.to_wkb(CoordDimensions::xy())?)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test::polygon;
    use geo::point;

    const POINT_1_2: &str = "0101000000000000000000F03F0000000000000040";

    #[test]
    fn read_point_hex() {
        let geometry = read_wkb_hex(POINT_1_2).unwrap();
        assert_eq!(geometry, Geometry::Point(point!(x: 1., y: 2.)));
    }

    #[test]
    fn hex_tolerates_prefix_and_whitespace() {
        let pasted = format!("0x{}\n  {}", &POINT_1_2[..20], &POINT_1_2[20..]);
        assert_eq!(decode_hex(&pasted).unwrap(), hex::decode(POINT_1_2).unwrap());
    }

    #[test]
    fn write_is_little_endian_2d() {
        let bytes = write_wkb(&Geometry::Point(point!(x: 1., y: 2.))).unwrap();
        assert_eq!(hex::encode_upper(&bytes), POINT_1_2);

        let square = Geometry::Polygon(polygon::unit_square());
        assert_eq!(read_wkb(&write_wkb(&square).unwrap()).unwrap(), square);
    }

    #[test]
    fn invalid_input() {
        assert_eq!(read_wkb_hex("zz").unwrap_err().kind(), ErrorKind::Parse);
        assert_eq!(read_wkb_hex("").unwrap_err().kind(), ErrorKind::Parse);
        assert_eq!(read_wkb(&[1, 1, 0]).unwrap_err().kind(), ErrorKind::Parse);
    }
}
