//! Request-scoped page handlers.
//!
//! Each handler receives the complete input of one interaction and runs it through
//! resolve, stats, map and export. Nothing is remembered between calls. A failure at any stage
//! stops the pipeline and is reported inline in [`PageResponse::error`], next to whatever the
//! earlier stages produced.

use serde::Serialize;

use crate::algorithm::stats::GeometryStats;
use crate::error::{CartoError, ErrorKind};
use crate::io::csv::WktColumnReport;
use crate::io::export::ExportArtifact;

pub use converter::{converter_page, ConverterRequest};
pub use csv_viewer::{csv_viewer_page, CsvViewerRequest};
pub use wkt_checker::{wkt_checker_page, WktCheckerRequest};
pub use wkt_viewer::{wkt_viewer_page, WktViewerRequest};

mod converter;
mod csv_viewer;
mod wkt_checker;
mod wkt_viewer;

/// An error as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<CartoError> for PageError {
    fn from(err: CartoError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// What a page shows after one interaction.
#[derive(Debug, Clone, Default)]
pub struct PageResponse {
    /// Standalone Leaflet page of the loaded geometries.
    pub map_html: Option<String>,

    pub stats: Option<GeometryStats>,

    /// Lines of text shown under the map.
    pub summary: Vec<String>,

    /// Header names of an uploaded CSV, for the column picker.
    pub columns: Vec<String>,

    /// How many cells of the chosen CSV column hold valid WKT.
    pub validation: Option<WktColumnReport>,

    pub artifact: Option<ExportArtifact>,

    pub error: Option<PageError>,
}

impl PageResponse {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Whether the request carried no input at all.
    pub fn is_blank(&self) -> bool {
        self.map_html.is_none()
            && self.summary.is_empty()
            && self.columns.is_empty()
            && self.is_ok()
    }
}

/// Run `stages` against a fresh response, recording the first error instead of returning it.
fn respond<F>(page: &'static str, stages: F) -> PageResponse
where
    F: FnOnce(&mut PageResponse) -> crate::error::Result<()>,
{
    let mut response = PageResponse::default();
    if let Err(err) = stages(&mut response) {
        tracing::warn!(page, kind = ?err.kind(), %err, "Page interaction failed");
        response.error = Some(err.into());
    }
    response
}

/// A text field that holds something other than whitespace.
fn filled(text: &Option<String>) -> Option<&str> {
    text.as_deref().map(str::trim).filter(|text| !text.is_empty())
}
