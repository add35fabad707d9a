//! Load, inspect, measure and convert vector geometries.
//!
//! Input in any of the supported interchange formats (WKT, WKB, GeoJSON, KML, CSV with a WKT
//! column, Shapefile) is resolved into a [`GeometryTable`](table::GeometryTable). From there the
//! table can be measured with [`algorithm::stats`], drawn with [`map`] and written back out with
//! [`io::export`]. The [`page`] module wires these steps together into request-scoped handlers.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![cfg_attr(not(test), deny(unused_crate_dependencies))]

pub use error::{CartoError, ErrorKind, Result};

pub mod algorithm;
pub mod config;
pub mod crs;
pub mod error;
pub mod io;
pub mod map;
pub mod page;
pub mod table;
#[cfg(test)]
pub(crate) mod test;
