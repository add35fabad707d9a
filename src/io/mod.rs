//! Readers and writers for the supported interchange formats, plus the two pipeline stages built
//! on them: [`source`] turns raw input into a table and [`export`] turns a table into a file.

pub mod csv;
pub mod export;
pub mod geojson;
pub mod kml;
pub mod shapefile;
pub mod source;
pub mod wkb;
pub mod wkt;
