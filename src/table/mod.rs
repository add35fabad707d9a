//! The geometry table: attribute columns paired with one geometry column and a table-wide CRS.
//!
//! Attributes live in an Arrow [`RecordBatch`]; geometries are `geo` values so that every
//! algorithm in [`crate::algorithm`] can work on them directly.

use std::sync::Arc;

use arrow_array::cast::AsArray;
use arrow_array::types::{Float64Type, Int64Type};
use arrow_array::{Array, BooleanArray, RecordBatch, RecordBatchOptions};
use arrow_schema::{DataType, Schema};
use geo::Geometry;

use crate::crs::Crs;
use crate::error::{CartoError, Result};

pub use builder::{AttributeValue, TableBuilder};

mod builder;
mod column;
pub(crate) mod data_source;

/// The closed set of geometry kinds a table row can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
}

impl GeometryKind {
    pub fn of(geometry: &Geometry) -> Self {
        match geometry {
            Geometry::Point(_) => GeometryKind::Point,
            Geometry::Line(_) | Geometry::LineString(_) => GeometryKind::LineString,
            Geometry::Polygon(_) | Geometry::Rect(_) | Geometry::Triangle(_) => {
                GeometryKind::Polygon
            }
            Geometry::MultiPoint(_) => GeometryKind::MultiPoint,
            Geometry::MultiLineString(_) => GeometryKind::MultiLineString,
            Geometry::MultiPolygon(_) => GeometryKind::MultiPolygon,
            Geometry::GeometryCollection(_) => GeometryKind::GeometryCollection,
        }
    }

    pub fn is_puntal(&self) -> bool {
        matches!(self, GeometryKind::Point | GeometryKind::MultiPoint)
    }

    pub fn is_lineal(&self) -> bool {
        matches!(
            self,
            GeometryKind::LineString | GeometryKind::MultiLineString
        )
    }

    pub fn is_polygonal(&self) -> bool {
        matches!(self, GeometryKind::Polygon | GeometryKind::MultiPolygon)
    }

    pub fn name(&self) -> &'static str {
        match self {
            GeometryKind::Point => "Point",
            GeometryKind::LineString => "LineString",
            GeometryKind::Polygon => "Polygon",
            GeometryKind::MultiPoint => "MultiPoint",
            GeometryKind::MultiLineString => "MultiLineString",
            GeometryKind::MultiPolygon => "MultiPolygon",
            GeometryKind::GeometryCollection => "GeometryCollection",
        }
    }
}

/// An ordered sequence of rows, each with an optional geometry and zero or more attributes.
///
/// Every geometry is expressed in [`GeometryTable::crs`]. The only way to change the CRS is
/// [`Reproject`](crate::algorithm::reproject::Reproject), which rewrites all coordinates and the
/// identifier together.
#[derive(Debug, Clone)]
pub struct GeometryTable {
    attributes: RecordBatch,
    geometries: Vec<Option<Geometry>>,
    crs: Crs,
}

impl GeometryTable {
    pub fn try_new(
        attributes: RecordBatch,
        geometries: Vec<Option<Geometry>>,
        crs: Crs,
    ) -> Result<Self> {
        if attributes.num_rows() != geometries.len() {
            return Err(CartoError::Parse(format!(
                "attribute rows ({}) and geometry rows ({}) differ",
                attributes.num_rows(),
                geometries.len()
            )));
        }
        Ok(Self {
            attributes,
            geometries,
            crs,
        })
    }

    /// A table without attribute columns.
    pub fn from_geometries(geometries: Vec<Option<Geometry>>, crs: Crs) -> Result<Self> {
        let attributes = empty_batch(geometries.len())?;
        Self::try_new(attributes, geometries, crs)
    }

    /// A one-row table, as produced from a pasted WKT or WKB string.
    pub fn single(geometry: Geometry, crs: Crs) -> Result<Self> {
        Self::from_geometries(vec![Some(geometry)], crs)
    }

    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    pub fn attributes(&self) -> &RecordBatch {
        &self.attributes
    }

    pub fn geometries(&self) -> &[Option<Geometry>] {
        &self.geometries
    }

    pub fn geometry(&self, i: usize) -> Option<&Geometry> {
        self.geometries.get(i).and_then(|g| g.as_ref())
    }

    /// The geometries of rows that have one, in row order.
    pub fn iter_geometries(&self) -> impl Iterator<Item = &Geometry> + '_ {
        self.geometries.iter().flatten()
    }

    /// Number of rows carrying a geometry.
    pub fn valid_count(&self) -> usize {
        self.iter_geometries().count()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.attributes
            .schema_ref()
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect()
    }

    /// The value of one attribute cell, `None` when the cell is null or out of range.
    pub fn attribute(&self, row: usize, column: usize) -> Option<AttributeValue> {
        if row >= self.len() || column >= self.attributes.num_columns() {
            return None;
        }
        let array = self.attributes.column(column);
        if array.is_null(row) {
            return None;
        }
        match array.data_type() {
            DataType::Boolean => Some(AttributeValue::Bool(array.as_boolean().value(row))),
            DataType::Int64 => Some(AttributeValue::Int(
                array.as_primitive::<Int64Type>().value(row),
            )),
            DataType::Float64 => Some(AttributeValue::Float(
                array.as_primitive::<Float64Type>().value(row),
            )),
            DataType::Utf8 => Some(AttributeValue::String(
                array.as_string::<i32>().value(row).to_string(),
            )),
            _ => None,
        }
    }

    /// Name/value pairs of the non-null attributes of one row, in column order.
    pub fn row_attributes(&self, row: usize) -> Vec<(&str, AttributeValue)> {
        self.column_names()
            .into_iter()
            .enumerate()
            .filter_map(|(column, name)| self.attribute(row, column).map(|value| (name, value)))
            .collect()
    }

    pub fn kinds(&self) -> Vec<GeometryKind> {
        self.iter_geometries().map(GeometryKind::of).collect()
    }

    /// Kind of the first row that has a geometry.
    pub fn first_kind(&self) -> Option<GeometryKind> {
        self.iter_geometries().next().map(GeometryKind::of)
    }

    /// A copy holding only the rows that carry a geometry.
    pub fn drop_null_geometries(&self) -> Result<Self> {
        if self.valid_count() == self.len() {
            return Ok(self.clone());
        }

        let mask: BooleanArray = self
            .geometries
            .iter()
            .map(|g| Some(g.is_some()))
            .collect();
        let geometries: Vec<_> = self.geometries.iter().flatten().cloned().map(Some).collect();
        let attributes = if self.attributes.num_columns() == 0 {
            empty_batch(geometries.len())?
        } else {
            arrow_select::filter::filter_record_batch(&self.attributes, &mask)?
        };
        Self::try_new(attributes, geometries, self.crs.clone())
    }

    /// Replace every geometry with the output of `f`, tagging the result with `crs`.
    ///
    /// Either all geometries are rewritten or, on the first error, none are.
    pub(crate) fn try_map_geometries<F>(&self, crs: Crs, mut f: F) -> Result<Self>
    where
        F: FnMut(&Geometry) -> Result<Geometry>,
    {
        let geometries = self
            .geometries
            .iter()
            .map(|maybe_geom| maybe_geom.as_ref().map(&mut f).transpose())
            .collect::<Result<Vec<_>>>()?;
        Self::try_new(self.attributes.clone(), geometries, crs)
    }

    pub fn into_inner(self) -> (RecordBatch, Vec<Option<Geometry>>, Crs) {
        (self.attributes, self.geometries, self.crs)
    }
}

pub(crate) fn empty_batch(num_rows: usize) -> Result<RecordBatch> {
    let options = RecordBatchOptions::new().with_row_count(Some(num_rows));
    Ok(RecordBatch::try_new_with_options(
        Arc::new(Schema::empty()),
        vec![],
        &options,
    )?)
}
