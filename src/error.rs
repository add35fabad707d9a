//! Defines [`CartoError`], representing all errors returned by this crate.

use std::fmt::Debug;

use arrow_schema::ArrowError;
use serde::Serialize;
use thiserror::Error;

/// The three ways a page interaction can fail.
///
/// Every [`CartoError`] maps onto exactly one of these through [`CartoError::kind`]. None of them
/// are fatal: a page reports the message inline and waits for corrected input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Malformed WKT/WKB, unsupported upload type, or an unreadable file.
    Parse,
    /// Invalid, missing or unsupported coordinate reference system.
    Projection,
    /// Failure while producing an export artifact.
    Export,
}

/// Enum with all errors in this crate.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CartoError {
    /// Input could not be understood.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Reprojection between two reference systems failed.
    #[error("Projection error: {0}")]
    Projection(String),

    /// An export artifact could not be produced.
    #[error("Export error: {0}")]
    Export(String),

    /// [ArrowError]
    #[error(transparent)]
    Arrow(#[from] ArrowError),

    /// [csv::Error]
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// [dbase::Error]
    #[error(transparent)]
    Dbase(#[from] dbase::Error),

    /// [geodesy::Error]
    #[error(transparent)]
    Geodesy(#[from] geodesy::Error),

    /// [geozero::error::GeozeroError]
    #[error(transparent)]
    Geozero(#[from] geozero::error::GeozeroError),

    /// [geojson::Error]
    #[error(transparent)]
    GeoJson(#[from] geojson::Error),

    /// [hex::FromHexError]
    #[error(transparent)]
    Hex(#[from] hex::FromHexError),

    /// [std::io::Error]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// [proj::ProjError]
    #[cfg(feature = "proj")]
    #[error(transparent)]
    ProjError(#[from] proj::ProjError),

    /// [proj::ProjCreateError]
    #[cfg(feature = "proj")]
    #[error(transparent)]
    ProjCreateError(#[from] proj::ProjCreateError),

    /// [serde_json::Error]
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    /// [shapefile::Error]
    #[error(transparent)]
    Shapefile(#[from] shapefile::Error),

    /// [quick_xml::Error]
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),

    /// [zip::result::ZipError]
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

impl CartoError {
    /// Classify this error into one of the user-facing [`ErrorKind`]s.
    ///
    /// Wrapped library errors that were never re-tagged at a stage boundary fall back to the
    /// side of the pipeline their library usually lives on.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CartoError::Parse(_) => ErrorKind::Parse,
            CartoError::Projection(_) => ErrorKind::Projection,
            CartoError::Export(_) => ErrorKind::Export,
            CartoError::Geodesy(_) => ErrorKind::Projection,
            #[cfg(feature = "proj")]
            CartoError::ProjError(_) | CartoError::ProjCreateError(_) => ErrorKind::Projection,
            CartoError::IOError(_) | CartoError::Zip(_) => ErrorKind::Export,
            _ => ErrorKind::Parse,
        }
    }

    /// Re-tag any error raised while reading input as a [`CartoError::Parse`].
    pub(crate) fn into_parse(self) -> Self {
        match self {
            err @ CartoError::Parse(_) => err,
            err if err.kind() == ErrorKind::Projection => err,
            other => CartoError::Parse(other.to_string()),
        }
    }

    /// Re-tag any error raised while writing output as a [`CartoError::Export`].
    pub(crate) fn into_export(self) -> Self {
        match self {
            err @ CartoError::Export(_) => err,
            err if err.kind() == ErrorKind::Projection => err,
            other => CartoError::Export(other.to_string()),
        }
    }
}

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, CartoError>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn stage_retagging() {
        let err = CartoError::from(hex::FromHexError::OddLength).into_parse();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(err.to_string().starts_with("Parse error"));

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = CartoError::from(io).into_export();
        assert_eq!(err.kind(), ErrorKind::Export);

        let err = CartoError::Projection("unknown CRS".to_string()).into_export();
        assert_eq!(err.kind(), ErrorKind::Projection);
    }
}
