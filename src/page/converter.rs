use serde::Deserialize;

use crate::algorithm::stats::{compute_stats, AreaUnit, StatsOptions};
use crate::config::PageConfig;
use crate::io::export::{export, ExportFormat};
use crate::io::source::{resolve, Input, Upload};
use crate::map::MapView;
use crate::page::{filled, respond, PageResponse};

/// Input of the converter page: one upload, a WKT string or a WKB hex string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConverterRequest {
    /// Set by the host from the multipart body.
    #[serde(skip)]
    pub upload: Option<Upload>,

    pub wkt: Option<String>,

    pub wkb_hex: Option<String>,

    pub area_unit: AreaUnit,

    /// Export the loaded geometries in this format.
    pub export: Option<ExportFormat>,
}

impl ConverterRequest {
    /// An upload wins over pasted WKT, which wins over pasted WKB.
    fn input(&self) -> Option<Input> {
        if let Some(upload) = &self.upload {
            Some(Input::Upload(upload.clone()))
        } else if let Some(wkt) = filled(&self.wkt) {
            Some(Input::Wkt(wkt.to_string()))
        } else {
            filled(&self.wkb_hex).map(|hex| Input::WkbHex(hex.to_string()))
        }
    }
}

/// Load, show, measure and optionally convert a geospatial file or string.
pub fn converter_page(request: &ConverterRequest, config: &PageConfig) -> PageResponse {
    respond("converter", |response| {
        let Some(input) = request.input() else {
            return Ok(());
        };
        let table = resolve(input, &config.resolve)?;

        let map_options = config.map.clone().or_zoom_start(15);
        response.map_html = Some(MapView::from_table(&table, &map_options)?.to_html()?);

        let stats_options = StatsOptions {
            area_unit: request.area_unit,
            ..config.stats.clone()
        };
        let stats = compute_stats(&table, &stats_options)?;
        response.summary = stats.summary();
        response.stats = Some(stats);

        if let Some(format) = request.export {
            response.artifact = Some(export(&table, format, &config.export)?);
        }
        Ok(())
    })
}
