use std::fmt::Display;
use std::sync::Arc;

use arrow_array::{RecordBatch, RecordBatchOptions};
use arrow_schema::{Field, Schema};
use geo::Geometry;
use geozero::geo_types::GeoWriter;
use geozero::{ColumnValue, FeatureProcessor, GeomProcessor, PropertyProcessor};
use indexmap::IndexMap;

use crate::crs::Crs;
use crate::error::Result;
use crate::table::column::ColumnBuilder;
use crate::table::GeometryTable;

/// A scalar attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeValue::Bool(v) => write!(f, "{}", v),
            AttributeValue::Int(v) => write!(f, "{}", v),
            AttributeValue::Float(v) => write!(f, "{}", v),
            AttributeValue::String(v) => write!(f, "{}", v),
        }
    }
}

impl From<&ColumnValue<'_>> for AttributeValue {
    fn from(value: &ColumnValue<'_>) -> Self {
        match value {
            ColumnValue::Bool(v) => AttributeValue::Bool(*v),
            ColumnValue::Byte(v) => AttributeValue::Int(*v as i64),
            ColumnValue::UByte(v) => AttributeValue::Int(*v as i64),
            ColumnValue::Short(v) => AttributeValue::Int(*v as i64),
            ColumnValue::UShort(v) => AttributeValue::Int(*v as i64),
            ColumnValue::Int(v) => AttributeValue::Int(*v as i64),
            ColumnValue::UInt(v) => AttributeValue::Int(*v as i64),
            ColumnValue::Long(v) => AttributeValue::Int(*v),
            // Values past i64::MAX lose precision rather than wrap
            ColumnValue::ULong(v) => match i64::try_from(*v) {
                Ok(v) => AttributeValue::Int(v),
                Err(_) => AttributeValue::Float(*v as f64),
            },
            ColumnValue::Float(v) => AttributeValue::Float(*v as f64),
            ColumnValue::Double(v) => AttributeValue::Float(*v),
            ColumnValue::String(v) | ColumnValue::Json(v) | ColumnValue::DateTime(v) => {
                AttributeValue::String(v.to_string())
            }
            ColumnValue::Binary(v) => AttributeValue::String(hex::encode(v)),
        }
    }
}

/// Assemble a [`GeometryTable`] row by row.
///
/// Readers either push finished rows with [`TableBuilder::push_row`] or hand the builder to a
/// geozero datasource, in which case geometries are assembled by a [`GeoWriter`] and properties
/// are collected column by column. Columns that a feature does not mention are null for that row.
pub struct TableBuilder {
    /// Column name to its builder, in first-seen order
    columns: IndexMap<String, ColumnBuilder>,
    geometries: Vec<Option<Geometry>>,
    geometry_writer: GeoWriter,
    crs: Crs,
}

impl TableBuilder {
    pub fn new(crs: Crs) -> Self {
        Self {
            columns: IndexMap::new(),
            geometries: Vec::new(),
            geometry_writer: GeoWriter::new(),
            crs,
        }
    }

    /// Number of rows finished so far.
    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn set_crs(&mut self, crs: Crs) {
        self.crs = crs;
    }

    /// Set one attribute of the row currently being built.
    pub fn push_attribute(&mut self, name: &str, value: AttributeValue) {
        let row_index = self.len();
        if let Some(column) = self.columns.get_mut(name) {
            if column.len() == row_index + 1 {
                // Repeated key within one feature; the first value wins
                return;
            }
            column.push(value);
        } else {
            let column = ColumnBuilder::from_value_prefill(value, row_index);
            self.columns.insert(name.to_string(), column);
        }
    }

    /// Finish the current row with the given geometry.
    pub fn push_geometry(&mut self, geometry: Option<Geometry>) {
        let row_index = self.len();
        for column in self.columns.values_mut() {
            if column.len() == row_index {
                column.push_null();
            }
        }
        self.geometries.push(geometry);
    }

    /// Append a complete row.
    pub fn push_row<I, S>(&mut self, geometry: Option<Geometry>, attributes: I)
    where
        I: IntoIterator<Item = (S, AttributeValue)>,
        S: AsRef<str>,
    {
        for (name, value) in attributes {
            self.push_attribute(name.as_ref(), value);
        }
        self.push_geometry(geometry);
    }

    pub fn finish(mut self) -> Result<GeometryTable> {
        // A bare geometry document never opens a feature
        if let Some(geometry) = self.geometry_writer.take_geometry() {
            self.push_geometry(Some(geometry));
        }

        let num_rows = self.geometries.len();
        let mut fields = Vec::with_capacity(self.columns.len());
        let mut arrays = Vec::with_capacity(self.columns.len());
        for (name, column) in self.columns {
            let (data_type, array) = column.finish();
            fields.push(Field::new(name, data_type, true));
            arrays.push(array);
        }

        let options = RecordBatchOptions::new().with_row_count(Some(num_rows));
        let attributes =
            RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), arrays, &options)?;
        GeometryTable::try_new(attributes, self.geometries, self.crs)
    }
}

impl FeatureProcessor for TableBuilder {
    fn feature_begin(&mut self, _idx: u64) -> geozero::error::Result<()> {
        // Discard anything a previous malformed feature left behind
        let _ = self.geometry_writer.take_geometry();
        Ok(())
    }

    fn feature_end(&mut self, _idx: u64) -> geozero::error::Result<()> {
        let geometry = self.geometry_writer.take_geometry();
        self.push_geometry(geometry);
        Ok(())
    }
}

impl PropertyProcessor for TableBuilder {
    fn property(
        &mut self,
        _idx: usize,
        name: &str,
        value: &ColumnValue,
    ) -> geozero::error::Result<bool> {
        self.push_attribute(name, value.into());
        Ok(false)
    }
}

impl GeomProcessor for TableBuilder {
    fn xy(&mut self, x: f64, y: f64, idx: usize) -> geozero::error::Result<()> {
        self.geometry_writer.xy(x, y, idx)
    }

    fn coordinate(
        &mut self,
        x: f64,
        y: f64,
        z: Option<f64>,
        m: Option<f64>,
        t: Option<f64>,
        tm: Option<u64>,
        idx: usize,
    ) -> geozero::error::Result<()> {
        self.geometry_writer.coordinate(x, y, z, m, t, tm, idx)
    }

    fn empty_point(&mut self, idx: usize) -> geozero::error::Result<()> {
        self.geometry_writer.empty_point(idx)
    }

    fn point_begin(&mut self, idx: usize) -> geozero::error::Result<()> {
        self.geometry_writer.point_begin(idx)
    }

    fn point_end(&mut self, idx: usize) -> geozero::error::Result<()> {
        self.geometry_writer.point_end(idx)
    }

    fn multipoint_begin(&mut self, size: usize, idx: usize) -> geozero::error::Result<()> {
        self.geometry_writer.multipoint_begin(size, idx)
    }

    fn multipoint_end(&mut self, idx: usize) -> geozero::error::Result<()> {
        self.geometry_writer.multipoint_end(idx)
    }

    fn linestring_begin(
        &mut self,
        tagged: bool,
        size: usize,
        idx: usize,
    ) -> geozero::error::Result<()> {
        self.geometry_writer.linestring_begin(tagged, size, idx)
    }

    fn linestring_end(&mut self, tagged: bool, idx: usize) -> geozero::error::Result<()> {
        self.geometry_writer.linestring_end(tagged, idx)
    }

    fn multilinestring_begin(&mut self, size: usize, idx: usize) -> geozero::error::Result<()> {
        self.geometry_writer.multilinestring_begin(size, idx)
    }

    fn multilinestring_end(&mut self, idx: usize) -> geozero::error::Result<()> {
        self.geometry_writer.multilinestring_end(idx)
    }

    fn polygon_begin(
        &mut self,
        tagged: bool,
        size: usize,
        idx: usize,
    ) -> geozero::error::Result<()> {
        self.geometry_writer.polygon_begin(tagged, size, idx)
    }

    fn polygon_end(&mut self, tagged: bool, idx: usize) -> geozero::error::Result<()> {
        self.geometry_writer.polygon_end(tagged, idx)
    }

    fn multipolygon_begin(&mut self, size: usize, idx: usize) -> geozero::error::Result<()> {
        self.geometry_writer.multipolygon_begin(size, idx)
    }

    fn multipolygon_end(&mut self, idx: usize) -> geozero::error::Result<()> {
        self.geometry_writer.multipolygon_end(idx)
    }

    fn geometrycollection_begin(&mut self, size: usize, idx: usize) -> geozero::error::Result<()> {
        self.geometry_writer.geometrycollection_begin(size, idx)
    }

    fn geometrycollection_end(&mut self, idx: usize) -> geozero::error::Result<()> {
        self.geometry_writer.geometrycollection_end(idx)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use arrow_array::cast::AsArray;
    use arrow_array::types::Int64Type;
    use arrow_array::Array;
    use geo::point;

    #[test]
    fn sparse_columns_are_padded() {
        let mut builder = TableBuilder::new(Crs::wgs84());
        builder.push_row(
            Some(point!(x: 0., y: 0.).into()),
            [("a", AttributeValue::Int(1))],
        );
        builder.push_row(
            Some(point!(x: 1., y: 1.).into()),
            [("b", AttributeValue::String("x".to_string()))],
        );
        builder.push_row(None, Vec::<(&str, AttributeValue)>::new());

        let table = builder.finish().unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.column_names(), vec!["a", "b"]);

        let a = table.attributes().column(0).as_primitive::<Int64Type>();
        assert_eq!(a.value(0), 1);
        assert!(a.is_null(1));
        assert!(a.is_null(2));

        let b = table.attributes().column(1).as_string::<i32>();
        assert!(b.is_null(0));
        assert_eq!(b.value(1), "x");
    }

    #[test]
    fn process_geozero_feature() {
        let mut builder = TableBuilder::new(Crs::wgs84());
        builder.feature_begin(0).unwrap();
        builder.properties_begin().unwrap();
        builder
            .property(0, "name", &ColumnValue::String("home"))
            .unwrap();
        builder.properties_end().unwrap();
        builder.geometry_begin().unwrap();
        builder.point_begin(0).unwrap();
        builder.xy(3., 4., 0).unwrap();
        builder.point_end(0).unwrap();
        builder.geometry_end().unwrap();
        builder.feature_end(0).unwrap();

        let table = builder.finish().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.geometry(0),
            Some(&Geometry::Point(point!(x: 3., y: 4.)))
        );
    }
}
