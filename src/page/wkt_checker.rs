use serde::Deserialize;

use crate::algorithm::stats::{compute_stats, AreaUnit, StatsOptions};
use crate::config::PageConfig;
use crate::error::CartoError;
use crate::io::export::{export, ExportFormat};
use crate::io::source::{resolve, Input};
use crate::map::MapView;
use crate::page::{respond, PageResponse};
use crate::table::GeometryKind;

/// The formats the checker offers.
const CHECKER_EXPORTS: [ExportFormat; 3] = [
    ExportFormat::Shapefile,
    ExportFormat::Kml,
    ExportFormat::GeoJson,
];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WktCheckerRequest {
    pub wkt: String,

    pub area_unit: AreaUnit,

    pub export: Option<ExportFormat>,
}

/// Check a single WKT string: parse it, report its perimeter and area, show it and export it.
///
/// Measurements are taken in [`PageConfig::checker_planar_crs`]. Points have nothing to measure.
pub fn wkt_checker_page(request: &WktCheckerRequest, config: &PageConfig) -> PageResponse {
    respond("wkt_checker", |response| {
        let table = resolve(Input::Wkt(request.wkt.clone()), &config.resolve)?;

        let stats_options = StatsOptions {
            area_unit: request.area_unit,
            ..config.stats.clone()
        }
        .with_planar_crs(config.checker_planar_crs.clone());
        let stats = compute_stats(&table, &stats_options)?;

        if table.first_kind() == Some(GeometryKind::Point) {
            response
                .summary
                .push("This is a Point geometry, no area or length to display.".to_string());
        } else {
            response
                .summary
                .push(format!("Perimeter (m): {}", stats.perimeter_m()));
            response
                .summary
                .push(format!("Area ({}): {}", request.area_unit, stats.area));
        }
        response.stats = Some(stats);

        let map_options = config.map.clone().or_zoom_start(10);
        response.map_html = Some(MapView::from_table(&table, &map_options)?.to_html()?);

        if let Some(format) = request.export {
            if !CHECKER_EXPORTS.contains(&format) {
                return Err(CartoError::Export(format!(
                    "{} export is not offered here",
                    format
                )));
            }
            response.artifact = Some(export(&table, format, &config.export)?);
        }
        Ok(())
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn point_has_nothing_to_measure() {
        let request = WktCheckerRequest {
            wkt: "POINT(8.5 47.3)".to_string(),
            ..Default::default()
        };
        let response = wkt_checker_page(&request, &PageConfig::default());
        assert_eq!(
            response.summary,
            vec!["This is a Point geometry, no area or length to display.".to_string()]
        );
        assert!(response.map_html.is_some());
    }

    #[test]
    fn polygon_reports_perimeter_and_area() {
        let request = WktCheckerRequest {
            wkt: "POLYGON((0 0, 0 1, 1 1, 1 0, 0 0))".to_string(),
            area_unit: AreaUnit::Acres,
            export: Some(ExportFormat::Kml),
        };
        let response = wkt_checker_page(&request, &PageConfig::default());
        assert!(response.is_ok(), "{:?}", response.error);
        assert!(response.summary[0].starts_with("Perimeter (m): "));
        assert!(response.summary[1].starts_with("Area (Acres): "));
        assert_eq!(response.artifact.unwrap().file_name, "output.kml");
    }

    #[test]
    fn wkb_export_not_offered() {
        let request = WktCheckerRequest {
            wkt: "POINT(1 1)".to_string(),
            export: Some(ExportFormat::Wkb),
            ..Default::default()
        };
        let response = wkt_checker_page(&request, &PageConfig::default());
        assert_eq!(response.error.unwrap().kind, ErrorKind::Export);
        assert!(response.map_html.is_some());
    }

    #[test]
    fn invalid_wkt() {
        let request = WktCheckerRequest {
            wkt: "POLYGON((0 0, 1 1".to_string(),
            ..Default::default()
        };
        let response = wkt_checker_page(&request, &PageConfig::default());
        assert_eq!(response.error.unwrap().kind, ErrorKind::Parse);
        assert!(response.summary.is_empty());
    }
}
