use std::io::Read;

use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};

use crate::crs::Crs;
use crate::error::{CartoError, Result};
use crate::io::wkt::read_wkt;
use crate::table::{AttributeValue, GeometryTable, TableBuilder};

/// Options for the CSV reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvReaderOptions {
    /// Field delimiter.
    pub delimiter: u8,

    /// The CRS of the coordinates in the file.
    pub crs: Crs,
}

impl CsvReaderOptions {
    pub fn new(delimiter: u8, crs: Crs) -> Self {
        Self { delimiter, crs }
    }

    fn reader<R: Read>(&self, reader: R) -> csv::Reader<R> {
        ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            // Short rows leave their missing cells null
            .flexible(true)
            .from_reader(reader)
    }
}

impl Default for CsvReaderOptions {
    fn default() -> Self {
        Self::new(b',', Crs::wgs84())
    }
}

/// Where the geometry of each CSV row comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CsvGeometry {
    /// One column holding WKT.
    Wkt { column: String },

    /// Two numeric columns forming a point.
    LonLat { lon: String, lat: String },
}

impl CsvGeometry {
    pub fn wkt(column: impl Into<String>) -> Self {
        CsvGeometry::Wkt {
            column: column.into(),
        }
    }

    fn source_columns(&self) -> Vec<&str> {
        match self {
            CsvGeometry::Wkt { column } => vec![column.as_str()],
            CsvGeometry::LonLat { lon, lat } => vec![lon.as_str(), lat.as_str()],
        }
    }
}

impl Default for CsvGeometry {
    /// The `Longitude`/`Latitude` pair used by spreadsheet exports.
    fn default() -> Self {
        CsvGeometry::LonLat {
            lon: "Longitude".to_string(),
            lat: "Latitude".to_string(),
        }
    }
}

/// How many cells of a WKT column parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct WktColumnReport {
    pub valid: usize,
    pub invalid: usize,
}

impl WktColumnReport {
    pub fn total(&self) -> usize {
        self.valid + self.invalid
    }
}

fn column_index(headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|header| header == name)
        .ok_or_else(|| CartoError::Parse(format!("CSV has no column named {:?}", name)))
}

/// Header names, in file order.
pub fn column_names<R: Read>(reader: R, options: &CsvReaderOptions) -> Result<Vec<String>> {
    let mut csv = options.reader(reader);
    Ok(csv.headers()?.iter().map(str::to_string).collect())
}

/// Count the cells of `column` that hold valid WKT, without building a table.
pub fn validate_wkt_column<R: Read>(
    reader: R,
    column: &str,
    options: &CsvReaderOptions,
) -> Result<WktColumnReport> {
    let mut csv = options.reader(reader);
    let index = column_index(csv.headers()?, column)?;

    let mut report = WktColumnReport::default();
    for record in csv.records() {
        match record?.get(index).map(read_wkt) {
            Some(Ok(_)) => report.valid += 1,
            _ => report.invalid += 1,
        }
    }
    Ok(report)
}

/// Read a CSV file into a [`GeometryTable`].
///
/// Columns that feed the geometry are consumed; every other column becomes a string attribute.
/// A cell that does not form a geometry leaves that row's geometry null instead of failing the
/// whole file.
pub fn read_csv<R: Read>(
    reader: R,
    geometry: &CsvGeometry,
    options: &CsvReaderOptions,
) -> Result<GeometryTable> {
    let mut csv = options.reader(reader);
    let headers = csv.headers()?.clone();

    let source_columns = geometry.source_columns();
    let source_indices = source_columns
        .iter()
        .map(|name| column_index(&headers, name))
        .collect::<Result<Vec<_>>>()?;

    let mut builder = TableBuilder::new(options.crs.clone());
    let mut dropped = 0;
    for (row, record) in csv.records().enumerate() {
        let record = record?;

        for (index, (name, value)) in headers.iter().zip(record.iter()).enumerate() {
            if !source_indices.contains(&index) {
                builder.push_attribute(name, AttributeValue::String(value.to_string()));
            }
        }

        let parsed = match geometry {
            CsvGeometry::Wkt { .. } => record
                .get(source_indices[0])
                .ok_or_else(|| CartoError::Parse("missing WKT cell".to_string()))
                .and_then(read_wkt),
            CsvGeometry::LonLat { .. } => lon_lat(&record, source_indices[0], source_indices[1]),
        };
        match parsed {
            Ok(geometry) => builder.push_geometry(Some(geometry)),
            Err(err) => {
                tracing::warn!(row, %err, "Dropping CSV geometry");
                dropped += 1;
                builder.push_geometry(None);
            }
        }
    }

    let table = builder.finish()?;
    tracing::info!(rows = table.len(), dropped, "Read CSV");
    Ok(table)
}

fn lon_lat(record: &StringRecord, lon: usize, lat: usize) -> Result<geo::Geometry> {
    let parse = |index: usize| -> Result<f64> {
        let cell = record.get(index).unwrap_or_default().trim();
        cell.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| CartoError::Parse(format!("not a coordinate: {:?}", cell)))
    };
    Ok(geo::Geometry::Point(geo::Point::new(parse(lon)?, parse(lat)?)))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ErrorKind;
    use geo::{point, Geometry};

    const WKT_CSV: &str = "id,geom\n1,POINT(1 1)\n2,not a geometry\n";

    #[test]
    fn invalid_cells_become_null_geometries() {
        let table = read_csv(
            WKT_CSV.as_bytes(),
            &CsvGeometry::wkt("geom"),
            &Default::default(),
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.valid_count(), 1);
        assert_eq!(table.geometry(0), Some(&Geometry::Point(point!(x: 1., y: 1.))));
        assert_eq!(table.geometry(1), None);
        assert_eq!(table.column_names(), vec!["id"]);
        assert_eq!(
            table.attribute(1, 0),
            Some(AttributeValue::String("2".to_string()))
        );
    }

    #[test]
    fn short_rows_are_kept() {
        let text = "id,geom\n1,POINT(1 1)\n2\n3,POINT(2 2)\n";
        let table = read_csv(text.as_bytes(), &CsvGeometry::wkt("geom"), &Default::default())
            .unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.valid_count(), 2);
        assert_eq!(table.geometry(1), None);
        assert_eq!(
            table.attribute(1, 0),
            Some(AttributeValue::String("2".to_string()))
        );

        let report = validate_wkt_column(text.as_bytes(), "geom", &Default::default()).unwrap();
        assert_eq!(report, WktColumnReport { valid: 2, invalid: 1 });
    }

    #[test]
    fn short_row_attributes_are_null() {
        let text = "geom,id\nPOINT(1 1),a\nPOINT(3 3)\n";
        let table = read_csv(text.as_bytes(), &CsvGeometry::wkt("geom"), &Default::default())
            .unwrap();
        assert_eq!(table.valid_count(), 2);
        assert_eq!(table.column_names(), vec!["id"]);
        assert_eq!(table.attribute(1, 0), None);
    }

    #[test]
    fn quoted_wkt_with_commas() {
        let text = "name,wkt\nsquare,\"POLYGON((0 0, 0 1, 1 1, 1 0, 0 0))\"\n";
        let table = read_csv(text.as_bytes(), &CsvGeometry::wkt("wkt"), &Default::default())
            .unwrap();
        assert_eq!(table.valid_count(), 1);
    }

    #[test]
    fn lon_lat_columns() {
        let text = "City,Longitude,Latitude\nBern,7.44,46.95\nNowhere,,\n";
        let table = read_csv(text.as_bytes(), &CsvGeometry::default(), &Default::default())
            .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.geometry(0),
            Some(&Geometry::Point(point!(x: 7.44, y: 46.95)))
        );
        assert_eq!(table.geometry(1), None);
        assert_eq!(table.column_names(), vec!["City"]);
    }

    #[test]
    fn missing_column() {
        let err = read_csv(
            WKT_CSV.as_bytes(),
            &CsvGeometry::wkt("shape"),
            &Default::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn header_and_validation() {
        assert_eq!(
            column_names(WKT_CSV.as_bytes(), &Default::default()).unwrap(),
            vec!["id", "geom"]
        );
        let report = validate_wkt_column(WKT_CSV.as_bytes(), "geom", &Default::default()).unwrap();
        assert_eq!(report, WktColumnReport { valid: 1, invalid: 1 });
        assert_eq!(report.total(), 2);
    }

    #[test]
    fn semicolon_delimiter() {
        let text = "id;geom\n1;POINT(3 4)\n";
        let options = CsvReaderOptions::new(b';', Crs::wgs84());
        let table = read_csv(text.as_bytes(), &CsvGeometry::wkt("geom"), &options).unwrap();
        assert_eq!(table.valid_count(), 1);
    }
}
