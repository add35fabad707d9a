//! Feed a [`GeometryTable`] through any geozero [`FeatureProcessor`].

use arrow_array::cast::AsArray;
use arrow_array::types::{Float64Type, Int64Type};
use arrow_array::{Array, RecordBatch};
use arrow_schema::DataType;
use geozero::error::GeozeroError;
use geozero::{ColumnValue, FeatureProcessor, GeozeroDatasource, GeozeroGeometry, PropertyProcessor};

use crate::table::GeometryTable;

impl GeozeroDatasource for GeometryTable {
    fn process<P: FeatureProcessor>(&mut self, processor: &mut P) -> Result<(), GeozeroError> {
        process_table(self, processor)
    }
}

/// Rows without a geometry are emitted as features with properties only.
pub(crate) fn process_table<P: FeatureProcessor>(
    table: &GeometryTable,
    processor: &mut P,
) -> Result<(), GeozeroError> {
    processor.dataset_begin(None)?;

    for (row_idx, maybe_geometry) in table.geometries().iter().enumerate() {
        processor.feature_begin(row_idx as u64)?;

        if table.attributes().num_columns() > 0 {
            processor.properties_begin()?;
            process_properties(table.attributes(), row_idx, processor)?;
            processor.properties_end()?;
        }

        if let Some(geometry) = maybe_geometry {
            processor.geometry_begin()?;
            geometry.process_geom(processor)?;
            processor.geometry_end()?;
        }

        processor.feature_end(row_idx as u64)?;
    }

    processor.dataset_end()
}

fn process_properties<P: PropertyProcessor>(
    batch: &RecordBatch,
    row_idx: usize,
    processor: &mut P,
) -> Result<(), GeozeroError> {
    // Null cells are skipped, so the property index is tracked separately
    let mut property_idx = 0;
    for (field, array) in batch.schema_ref().fields().iter().zip(batch.columns()) {
        if array.is_null(row_idx) {
            continue;
        }
        let name = field.name();

        let stop = match field.data_type() {
            DataType::Boolean => {
                let arr = array.as_boolean();
                processor.property(property_idx, name, &ColumnValue::Bool(arr.value(row_idx)))?
            }
            DataType::Int64 => {
                let arr = array.as_primitive::<Int64Type>();
                processor.property(property_idx, name, &ColumnValue::Long(arr.value(row_idx)))?
            }
            DataType::Float64 => {
                let arr = array.as_primitive::<Float64Type>();
                processor.property(
                    property_idx,
                    name,
                    &ColumnValue::Double(arr.value(row_idx)),
                )?
            }
            DataType::Utf8 => {
                let arr = array.as_string::<i32>();
                processor.property(
                    property_idx,
                    name,
                    &ColumnValue::String(arr.value(row_idx)),
                )?
            }
            dt => {
                return Err(GeozeroError::Property(format!(
                    "unsupported attribute type {dt} for column {name}"
                )))
            }
        };
        if stop {
            break;
        }
        property_idx += 1;
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::table;
    use crate::table::TableBuilder;

    #[test]
    fn copy_through_builder() {
        let mut source = table::with_null_row();
        let mut builder = TableBuilder::new(source.crs().clone());
        source.process(&mut builder).unwrap();
        let copy = builder.finish().unwrap();

        assert_eq!(copy.len(), source.len());
        assert_eq!(copy.geometries(), source.geometries());
        assert_eq!(copy.column_names(), source.column_names());
        assert_eq!(copy.attributes(), source.attributes());
    }
}
