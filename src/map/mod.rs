//! Map rendering: a Leaflet view of a [`GeometryTable`].
//!
//! The view is computed on a WGS84 copy of the table. The table passed in is never reprojected.

use geo::{Coord, Rect};
use geojson::{Feature, FeatureCollection, JsonObject, JsonValue};
use serde::{Deserialize, Serialize};

use crate::algorithm::bounds::{mean_center, union_bounds};
use crate::crs::Crs;
use crate::error::{CartoError, Result};
use crate::table::{AttributeValue, GeometryTable};

mod template;

const DEFAULT_ZOOM: u8 = 10;

/// Options for [`MapView::from_table`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapOptions {
    /// Initial zoom level. Each page has its own default when unset.
    pub zoom_start: Option<u8>,

    /// Tile URL template with `{z}`, `{x}` and `{y}` placeholders.
    pub tile_url: String,

    pub attribution: String,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            zoom_start: None,
            tile_url: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            attribution: "&copy; OpenStreetMap contributors".to_string(),
        }
    }
}

impl MapOptions {
    pub fn with_zoom_start(self, zoom_start: u8) -> Self {
        Self {
            zoom_start: Some(zoom_start),
            ..self
        }
    }

    /// Use `zoom_start` unless a zoom level is already set.
    pub fn or_zoom_start(self, zoom_start: u8) -> Self {
        Self {
            zoom_start: self.zoom_start.or(Some(zoom_start)),
            ..self
        }
    }
}

/// Everything needed to draw a table on a web map, in WGS84 longitude/latitude.
#[derive(Debug, Clone)]
pub struct MapView {
    center: Coord,
    bounds: Rect,
    overlays: FeatureCollection,
    options: MapOptions,
}

impl MapView {
    /// Build the view of every row that has a geometry.
    ///
    /// The center is the mean of the geometries' centroids, so a one-row table is centered on
    /// its own centroid.
    pub fn from_table(table: &GeometryTable, options: &MapOptions) -> Result<Self> {
        let wgs84 = table.to_crs(&Crs::wgs84())?;

        let no_geometries = || CartoError::Parse("no geometries to display".to_string());
        let center = mean_center(wgs84.iter_geometries()).ok_or_else(no_geometries)?;
        let bounds = union_bounds(wgs84.iter_geometries()).ok_or_else(no_geometries)?;

        let features = wgs84
            .geometries()
            .iter()
            .enumerate()
            .filter_map(|(row, geometry)| {
                let geometry = geometry.as_ref()?;
                let properties: JsonObject = wgs84
                    .row_attributes(row)
                    .into_iter()
                    .map(|(name, value)| (name.to_string(), json_value(value)))
                    .collect();
                Some(Feature {
                    bbox: None,
                    geometry: Some(geojson::Geometry::new(geojson::Value::from(geometry))),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                })
            })
            .collect();

        tracing::debug!(
            center_x = center.x,
            center_y = center.y,
            from = %table.crs(),
            "Built map view"
        );
        Ok(Self {
            center,
            bounds,
            overlays: FeatureCollection {
                bbox: None,
                features,
                foreign_members: None,
            },
            options: options.clone(),
        })
    }

    /// Longitude/latitude of the initial view.
    pub fn center(&self) -> Coord {
        self.center
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// One GeoJSON feature per row that has a geometry, carrying the row's attributes.
    pub fn overlays(&self) -> &FeatureCollection {
        &self.overlays
    }

    pub fn zoom_start(&self) -> u8 {
        self.options.zoom_start.unwrap_or(DEFAULT_ZOOM)
    }

    /// Render a standalone HTML page showing the overlays over a tile layer.
    pub fn to_html(&self) -> Result<String> {
        // Leaflet wants [lat, lon]
        let center = [self.center.y, self.center.x];
        let bounds = [
            [self.bounds.min().y, self.bounds.min().x],
            [self.bounds.max().y, self.bounds.max().x],
        ];

        Ok(template::MAP_HTML
            .replace("{{center}}", &script_json(&center)?)
            .replace("{{bounds}}", &script_json(&bounds)?)
            .replace("{{overlays}}", &script_json(&self.overlays)?)
            .replace("{{zoom}}", &self.zoom_start().to_string())
            .replace("{{tile_url}}", &script_json(&self.options.tile_url)?)
            .replace("{{attribution}}", &script_json(&self.options.attribution)?))
    }
}

fn json_value(value: AttributeValue) -> JsonValue {
    match value {
        AttributeValue::Bool(v) => JsonValue::Bool(v),
        AttributeValue::Int(v) => JsonValue::from(v),
        AttributeValue::Float(v) => serde_json::Number::from_f64(v)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        AttributeValue::String(v) => JsonValue::String(v),
    }
}

/// JSON that is safe to inline in a `<script>` element.
fn script_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}
