//! Read geometries from CSV files, either from a WKT column or from a longitude/latitude pair.

pub use reader::{
    column_names, read_csv, validate_wkt_column, CsvGeometry, CsvReaderOptions, WktColumnReport,
};

mod reader;
