use serde::Deserialize;

use crate::config::PageConfig;
use crate::error::CartoError;
use crate::io::csv::{column_names, validate_wkt_column, CsvGeometry};
use crate::io::source::{resolve, Input, ResolveOptions, Upload};
use crate::map::MapView;
use crate::page::{respond, PageResponse};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CsvViewerRequest {
    /// Set by the host from the multipart body.
    #[serde(skip)]
    pub upload: Option<Upload>,

    /// The WKT column. Defaults to the first column of the file.
    pub column: Option<String>,
}

/// Plot the WKT column of a CSV file.
///
/// The column is validated before anything is loaded; cells that do not parse leave their row
/// without a geometry and are counted in the summary.
pub fn csv_viewer_page(request: &CsvViewerRequest, config: &PageConfig) -> PageResponse {
    respond("csv_viewer", |response| {
        let Some(upload) = &request.upload else {
            return Ok(());
        };
        let csv_options = &config.resolve.csv;

        response.columns = column_names(upload.bytes.as_slice(), csv_options)?;
        let column = match &request.column {
            Some(column) => column.clone(),
            None => response
                .columns
                .first()
                .cloned()
                .ok_or_else(|| CartoError::Parse("CSV has no columns".to_string()))?,
        };

        let report = validate_wkt_column(upload.bytes.as_slice(), &column, csv_options)?;
        response.validation = Some(report);
        response.summary.push(format!(
            "Valid geometries in {}: {} of {}",
            column,
            report.valid,
            report.total()
        ));
        if report.valid == 0 {
            return Err(CartoError::Parse(format!(
                "column {:?} holds no valid WKT",
                column
            )));
        }

        let options = ResolveOptions {
            validate_csv: false,
            ..config.resolve.clone()
        }
        .with_csv_geometry(CsvGeometry::wkt(column));
        let table = resolve(Input::Upload(upload.clone()), &options)?;

        let map_options = config.map.clone().or_zoom_start(10);
        response.map_html = Some(MapView::from_table(&table, &map_options)?.to_html()?);
        Ok(())
    })
}
