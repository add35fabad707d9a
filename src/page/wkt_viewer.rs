use serde::Deserialize;

use crate::algorithm::stats::{compute_stats, StatsOptions};
use crate::config::PageConfig;
use crate::io::source::{resolve, Input};
use crate::map::MapView;
use crate::page::{respond, PageResponse};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WktViewerRequest {
    pub wkt: String,
}

/// Show one WKT geometry with its area in square meters, perimeter in meters and row count.
pub fn wkt_viewer_page(request: &WktViewerRequest, config: &PageConfig) -> PageResponse {
    respond("wkt_viewer", |response| {
        let table = resolve(Input::Wkt(request.wkt.clone()), &config.resolve)?;

        let map_options = config.map.clone().or_zoom_start(13);
        response.map_html = Some(MapView::from_table(&table, &map_options)?.to_html()?);

        let stats_options = StatsOptions {
            planar_crs: config.stats.planar_crs.clone(),
            ..Default::default()
        };
        let stats = compute_stats(&table, &stats_options)?;
        response.summary = vec![
            format!("Area: {} square meters", stats.area_m2()),
            format!("Perimeter: {} meters", stats.perimeter_m()),
            format!("Number of Polygons: {}", stats.count),
        ];
        response.stats = Some(stats);
        Ok(())
    })
}
