//! Turn whatever the user pasted or uploaded into a [`GeometryTable`].
//!
//! The format of an upload is decided once, from its media type and file name, and the bytes are
//! then handed to exactly one reader.

use std::fmt::Display;
use std::io::Cursor;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::crs::Crs;
use crate::error::{CartoError, Result};
use crate::io::csv::{read_csv, validate_wkt_column, CsvGeometry, CsvReaderOptions};
use crate::io::geojson::read_geojson;
use crate::io::kml::read_kml;
use crate::io::shapefile::{read_shapefile, read_shapefile_zip, ShapefileReaderOptions};
use crate::io::wkb::{read_wkb, read_wkb_hex};
use crate::io::wkt::read_wkt;
use crate::table::GeometryTable;

/// The upload formats understood by [`resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Csv,
    GeoJson,
    Kml,
    /// A zip bundle holding `.shp` and friends.
    Shapefile,
    /// A bare `.shp` without its sidecars.
    Shp,
    Wkb,
}

impl SourceFormat {
    /// Map a media type onto a format.
    ///
    /// `application/octet-stream` is ambiguous and never matches here; the file name decides.
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "text/csv" | "application/csv" | "application/vnd.ms-excel" => Some(SourceFormat::Csv),
            "application/geo+json" | "application/json" | "application/vnd.geo+json" => {
                Some(SourceFormat::GeoJson)
            }
            "application/vnd.google-earth.kml+xml" => Some(SourceFormat::Kml),
            "application/zip" | "application/x-zip-compressed" => Some(SourceFormat::Shapefile),
            "application/x-esri-shape" => Some(SourceFormat::Shp),
            "application/wkb" => Some(SourceFormat::Wkb),
            _ => None,
        }
    }

    /// Map a file name onto a format by its extension.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let extension = Path::new(file_name)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();
        match extension.as_str() {
            "csv" => Some(SourceFormat::Csv),
            "geojson" | "json" => Some(SourceFormat::GeoJson),
            "kml" => Some(SourceFormat::Kml),
            "zip" => Some(SourceFormat::Shapefile),
            "shp" => Some(SourceFormat::Shp),
            "wkb" => Some(SourceFormat::Wkb),
            _ => None,
        }
    }

    /// The file name wins over the media type, since browsers report many formats as
    /// `application/octet-stream` or guess wrongly.
    pub fn detect(file_name: &str, media_type: Option<&str>) -> Result<Self> {
        if let Some(format) =
            Self::from_file_name(file_name).or_else(|| media_type.and_then(Self::from_media_type))
        {
            return Ok(format);
        }

        if is_shapefile_sidecar(file_name, media_type) {
            return Err(CartoError::Parse(format!(
                "{} is only one part of a Shapefile; upload the zipped bundle with its .shp, .shx \
                 and .dbf files",
                file_name
            )));
        }
        Err(CartoError::Parse(format!(
            "unsupported file type: {} ({})",
            file_name,
            media_type.unwrap_or("unknown media type")
        )))
    }
}

fn is_shapefile_sidecar(file_name: &str, media_type: Option<&str>) -> bool {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    matches!(extension.as_deref(), Some("dbf" | "shx" | "prj" | "cpg"))
        || media_type
            .is_some_and(|media_type| media_type.trim().eq_ignore_ascii_case("application/x-dbf"))
}

impl Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SourceFormat::Csv => "CSV",
            SourceFormat::GeoJson => "GeoJSON",
            SourceFormat::Kml => "KML",
            SourceFormat::Shapefile => "Shapefile",
            SourceFormat::Shp => "SHP",
            SourceFormat::Wkb => "WKB",
        };
        f.write_str(name)
    }
}

/// An uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub media_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, media_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            media_type,
            bytes,
        }
    }

    pub fn format(&self) -> Result<SourceFormat> {
        SourceFormat::detect(&self.file_name, self.media_type.as_deref())
    }

    fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.bytes).map_err(|err| {
            CartoError::Parse(format!("{} is not UTF-8 text: {}", self.file_name, err))
        })
    }
}

/// One interaction's raw input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// A pasted WKT string.
    Wkt(String),
    /// A pasted hex-encoded WKB string.
    WkbHex(String),
    Upload(Upload),
}

/// Options for [`resolve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveOptions {
    /// CRS of pasted strings and of uploads that carry none.
    pub default_crs: Crs,

    /// Where CSV geometries come from.
    pub csv_geometry: CsvGeometry,

    pub csv: CsvReaderOptions,

    /// Check a WKT column before loading it, and refuse a column where nothing parses.
    pub validate_csv: bool,

    pub shapefile: ShapefileReaderOptions,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            default_crs: Crs::wgs84(),
            csv_geometry: CsvGeometry::default(),
            csv: CsvReaderOptions::default(),
            validate_csv: true,
            shapefile: ShapefileReaderOptions::default(),
        }
    }
}

impl ResolveOptions {
    pub fn with_csv_geometry(self, csv_geometry: CsvGeometry) -> Self {
        Self {
            csv_geometry,
            ..self
        }
    }
}

/// Load `input` into a [`GeometryTable`].
///
/// Every failure is reported as [`CartoError::Parse`].
pub fn resolve(input: Input, options: &ResolveOptions) -> Result<GeometryTable> {
    let table = match input {
        Input::Wkt(text) => read_wkt(&text)
            .and_then(|geometry| GeometryTable::single(geometry, options.default_crs.clone())),
        Input::WkbHex(text) => read_wkb_hex(&text)
            .and_then(|geometry| GeometryTable::single(geometry, options.default_crs.clone())),
        Input::Upload(upload) => resolve_upload(&upload, options),
    }
    .map_err(CartoError::into_parse)?;

    tracing::info!(
        rows = table.len(),
        valid = table.valid_count(),
        crs = %table.crs(),
        "Resolved input"
    );
    Ok(table)
}

fn resolve_upload(upload: &Upload, options: &ResolveOptions) -> Result<GeometryTable> {
    let format = upload.format()?;
    tracing::debug!(file_name = %upload.file_name, %format, "Dispatching upload");

    match format {
        SourceFormat::Csv => {
            if let (true, CsvGeometry::Wkt { column }) =
                (options.validate_csv, &options.csv_geometry)
            {
                let report = validate_wkt_column(upload.bytes.as_slice(), column, &options.csv)?;
                if report.total() > 0 && report.valid == 0 {
                    return Err(CartoError::Parse(format!(
                        "column {:?} holds no valid WKT",
                        column
                    )));
                }
            }
            read_csv(upload.bytes.as_slice(), &options.csv_geometry, &options.csv)
        }
        SourceFormat::GeoJson => read_geojson(upload.text()?),
        SourceFormat::Kml => read_kml(upload.text()?),
        SourceFormat::Shapefile => read_shapefile_zip(&upload.bytes, &options.shapefile),
        SourceFormat::Shp => {
            let crs = options
                .shapefile
                .crs
                .clone()
                .unwrap_or_else(|| options.default_crs.clone());
            read_shapefile(Cursor::new(upload.bytes.as_slice()), None, crs)
        }
        SourceFormat::Wkb => read_wkb(&upload.bytes)
            .and_then(|geometry| GeometryTable::single(geometry, options.default_crs.clone())),
    }
}
