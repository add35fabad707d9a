//! Settings shared by every page, loadable from JSON.

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::algorithm::stats::StatsOptions;
use crate::crs::Crs;
use crate::error::Result;
use crate::io::export::ExportOptions;
use crate::io::source::ResolveOptions;
use crate::map::MapOptions;

/// Options for every stage of a page interaction.
///
/// Every field has a default, so a config file only needs to name what it changes:
///
/// ```
/// use cartoconv::config::PageConfig;
///
/// let config = PageConfig::from_json_str(r#"{"map": {"zoom_start": 12}}"#).unwrap();
/// assert_eq!(config.map.zoom_start, Some(12));
/// assert_eq!(config.stats.planar_crs.to_string(), "EPSG:3857");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub resolve: ResolveOptions,

    pub stats: StatsOptions,

    /// Planar CRS used by the WKT checker, which measures in World Mercator.
    pub checker_planar_crs: Crs,

    pub map: MapOptions,

    pub export: ExportOptions,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            resolve: ResolveOptions::default(),
            stats: StatsOptions::default(),
            checker_planar_crs: Crs::world_mercator(),
            map: MapOptions::default(),
            export: ExportOptions::default(),
        }
    }
}

impl PageConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }
}
