//! Read from and write to ESRI Shapefiles.
//!
//! A Shapefile is a set of sidecar files sharing one stem: geometries in `.shp`, their index in
//! `.shx`, attributes in `.dbf` and the reference system in `.prj`. Uploads arrive either as a
//! zip bundle of those files or as a lone `.shp`.

pub use reader::{read_shapefile, read_shapefile_zip, ShapefileBundle, ShapefileReaderOptions};
pub use writer::{write_shapefile, ShapefileFiles};

mod reader;
mod writer;
