//! Read from and write to [KML](https://developers.google.com/kml/documentation/kmlreference)
//! documents.
//!
//! Only Placemarks are considered. Styles, overlays and folders are read past, and written
//! documents contain a flat list of Placemarks inside one `Document`.

pub use reader::read_kml;
pub use writer::write_kml;

mod reader;
mod writer;

/// Namespace of KML 2.2.
pub const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";
