//! Turn a [`GeometryTable`] into a downloadable file.
//!
//! Every export works on a WGS84 copy of the table; the caller's table is never modified. Text
//! and binary formats are built in memory. Shapefiles need real files, so they are written into
//! a scratch directory that exists only for the duration of one export and is removed when the
//! export returns, whether it succeeded or not.

use std::fmt::Display;
use std::fs;
use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::crs::Crs;
use crate::error::{CartoError, Result};
use crate::io::geojson::write_geojson;
use crate::io::kml::write_kml;
use crate::io::shapefile::write_shapefile;
use crate::io::wkb::write_wkb;
use crate::io::wkt::write_wkt;
use crate::table::GeometryTable;

/// The formats a table can be exported to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ExportFormat {
    Wkt,
    Wkb,
    GeoJson,
    Kml,
    Shapefile,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 5] = [
        ExportFormat::Wkt,
        ExportFormat::Wkb,
        ExportFormat::GeoJson,
        ExportFormat::Kml,
        ExportFormat::Shapefile,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Wkt => "wkt",
            ExportFormat::Wkb => "wkb",
            ExportFormat::GeoJson => "geojson",
            ExportFormat::Kml => "kml",
            ExportFormat::Shapefile => "zip",
        }
    }

    pub fn media_type(&self) -> &'static str {
        match self {
            ExportFormat::Wkt => "text/plain",
            ExportFormat::Wkb => "application/wkb",
            ExportFormat::GeoJson => "application/geo+json",
            ExportFormat::Kml => "application/vnd.google-earth.kml+xml",
            ExportFormat::Shapefile => "application/zip",
        }
    }

    /// Whether the artifact is UTF-8 text.
    pub fn is_text(&self) -> bool {
        matches!(
            self,
            ExportFormat::Wkt | ExportFormat::GeoJson | ExportFormat::Kml
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExportFormat::Wkt => "WKT",
            ExportFormat::Wkb => "WKB",
            ExportFormat::GeoJson => "GeoJSON",
            ExportFormat::Kml => "KML",
            ExportFormat::Shapefile => "Shapefile",
        }
    }
}

impl Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ExportFormat {
    type Err = CartoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "wkt" => Ok(ExportFormat::Wkt),
            "wkb" => Ok(ExportFormat::Wkb),
            "geojson" | "json" => Ok(ExportFormat::GeoJson),
            "kml" => Ok(ExportFormat::Kml),
            "shapefile" | "shapefile.zip" | "shp" | "zip" => Ok(ExportFormat::Shapefile),
            _ => Err(CartoError::Export(format!("unknown export format: {}", s))),
        }
    }
}

impl TryFrom<String> for ExportFormat {
    type Error = CartoError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ExportFormat> for String {
    fn from(value: ExportFormat) -> Self {
        value.label().to_string()
    }
}

/// Options for [`export`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Parent of the per-export scratch directories. Defaults to the system temporary directory.
    pub scratch_dir: Option<PathBuf>,

    /// File name of the artifact, without extension.
    pub file_stem: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            scratch_dir: None,
            file_stem: "output".to_string(),
        }
    }
}

impl ExportOptions {
    pub fn with_scratch_dir(self, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: Some(scratch_dir.into()),
            ..self
        }
    }

    fn scratch_parent(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// A finished export, ready to be offered for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub format: ExportFormat,
    pub file_name: String,
    pub media_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    fn new(format: ExportFormat, options: &ExportOptions, bytes: Vec<u8>) -> Self {
        Self {
            format,
            file_name: format!("{}.{}", options.file_stem, format.extension()),
            media_type: format.media_type(),
            bytes,
        }
    }

    /// The artifact as text, for the formats that are text.
    pub fn as_text(&self) -> Option<&str> {
        if self.format.is_text() {
            std::str::from_utf8(&self.bytes).ok()
        } else {
            None
        }
    }

    /// Uppercase hex of the bytes, the usual way to show WKB.
    pub fn to_hex(&self) -> String {
        hex::encode_upper(&self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// The rows of `table` that have a geometry, in WGS84.
fn prepare(table: &GeometryTable) -> Result<GeometryTable> {
    let wgs84 = table.to_crs(&Crs::wgs84())?.drop_null_geometries()?;
    if wgs84.is_empty() {
        return Err(CartoError::Export("no geometries to export".to_string()));
    }
    Ok(wgs84)
}

/// Write `table` in `format`.
///
/// Rows without a geometry are left out. WKB holds a single geometry, so only the first one is
/// exported; [`export_wkb_all`] encodes each row separately.
pub fn export(
    table: &GeometryTable,
    format: ExportFormat,
    options: &ExportOptions,
) -> Result<ExportArtifact> {
    let table = prepare(table)?;
    let bytes = match format {
        ExportFormat::Wkt => export_wkt(&table),
        ExportFormat::Wkb => table
            .iter_geometries()
            .next()
            .ok_or_else(|| CartoError::Export("no geometries to export".to_string()))
            .and_then(write_wkb),
        ExportFormat::GeoJson => {
            let mut buf = Vec::new();
            write_geojson(&table, &mut buf).map(|_| buf)
        }
        ExportFormat::Kml => write_kml(&table),
        ExportFormat::Shapefile => export_shapefile(&table, options),
    }
    .map_err(CartoError::into_export)?;

    let artifact = ExportArtifact::new(format, options, bytes);
    tracing::info!(
        format = %artifact.format,
        rows = table.len(),
        bytes = artifact.len(),
        "Exported table"
    );
    Ok(artifact)
}

/// WKB of every row that has a geometry, in WGS84.
pub fn export_wkb_all(table: &GeometryTable) -> Result<Vec<Vec<u8>>> {
    let table = prepare(table)?;
    table
        .iter_geometries()
        .map(|geometry| write_wkb(geometry).map_err(CartoError::into_export))
        .collect()
}

fn export_wkt(table: &GeometryTable) -> Result<Vec<u8>> {
    let lines = table
        .iter_geometries()
        .map(write_wkt)
        .collect::<Result<Vec<_>>>()?;
    Ok(lines.join("\n").into_bytes())
}

/// Write the layer into a fresh scratch directory and zip its sidecar files.
fn export_shapefile(table: &GeometryTable, options: &ExportOptions) -> Result<Vec<u8>> {
    let scratch = tempfile::Builder::new()
        .prefix("cartoconv-export-")
        .tempdir_in(options.scratch_parent())?;
    tracing::debug!(scratch = %scratch.path().display(), "Created export scratch directory");

    let files = write_shapefile(table, scratch.path(), &options.file_stem)?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let zip_options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for path in files.paths() {
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        zip.start_file(name, zip_options)?;
        zip.write_all(&fs::read(path)?)?;
    }
    let bytes = zip.finish()?.into_inner();

    scratch.close()?;
    Ok(bytes)
}
