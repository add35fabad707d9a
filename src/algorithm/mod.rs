//! Algorithms implemented on [`GeometryTable`](crate::table::GeometryTable)s.

pub mod bounds;
pub mod reproject;
pub mod stats;
