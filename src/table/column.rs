//! Accumulate attribute values of unknown type into an Arrow array.

use std::sync::Arc;

use arrow_array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow_schema::DataType;

use crate::table::AttributeValue;

/// A column whose type is inferred from the first value it receives.
///
/// Mixed inputs are widened rather than rejected: integers meeting floats become a float
/// column, and anything meeting a string becomes a string column.
#[derive(Debug, Clone)]
pub(crate) enum ColumnBuilder {
    Boolean(Vec<Option<bool>>),
    Int64(Vec<Option<i64>>),
    Float64(Vec<Option<f64>>),
    Utf8(Vec<Option<String>>),
}

impl ColumnBuilder {
    /// `row_index` is the row the value belongs to; earlier rows are filled with nulls.
    pub(crate) fn from_value_prefill(value: AttributeValue, row_index: usize) -> Self {
        let mut builder = match value {
            AttributeValue::Bool(_) => ColumnBuilder::Boolean(Vec::with_capacity(row_index + 1)),
            AttributeValue::Int(_) => ColumnBuilder::Int64(Vec::with_capacity(row_index + 1)),
            AttributeValue::Float(_) => ColumnBuilder::Float64(Vec::with_capacity(row_index + 1)),
            AttributeValue::String(_) => ColumnBuilder::Utf8(Vec::with_capacity(row_index + 1)),
        };
        for _ in 0..row_index {
            builder.push_null();
        }
        builder.push(value);
        builder
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            ColumnBuilder::Boolean(v) => v.len(),
            ColumnBuilder::Int64(v) => v.len(),
            ColumnBuilder::Float64(v) => v.len(),
            ColumnBuilder::Utf8(v) => v.len(),
        }
    }

    pub(crate) fn push_null(&mut self) {
        match self {
            ColumnBuilder::Boolean(v) => v.push(None),
            ColumnBuilder::Int64(v) => v.push(None),
            ColumnBuilder::Float64(v) => v.push(None),
            ColumnBuilder::Utf8(v) => v.push(None),
        }
    }

    pub(crate) fn push(&mut self, value: AttributeValue) {
        let widened = match (&mut *self, value) {
            (ColumnBuilder::Boolean(v), AttributeValue::Bool(x)) => return v.push(Some(x)),
            (ColumnBuilder::Int64(v), AttributeValue::Int(x)) => return v.push(Some(x)),
            (ColumnBuilder::Float64(v), AttributeValue::Float(x)) => return v.push(Some(x)),
            (ColumnBuilder::Float64(v), AttributeValue::Int(x)) => return v.push(Some(x as f64)),
            (ColumnBuilder::Utf8(v), value) => return v.push(Some(value.to_string())),
            (ColumnBuilder::Int64(v), AttributeValue::Float(x)) => {
                let mut widened: Vec<Option<f64>> =
                    v.iter().map(|maybe| maybe.map(|i| i as f64)).collect();
                widened.push(Some(x));
                ColumnBuilder::Float64(widened)
            }
            (other, value) => {
                let mut widened = other.to_strings();
                widened.push(Some(value.to_string()));
                ColumnBuilder::Utf8(widened)
            }
        };
        *self = widened;
    }

    fn to_strings(&self) -> Vec<Option<String>> {
        match self {
            ColumnBuilder::Boolean(v) => v.iter().map(|x| x.map(|x| x.to_string())).collect(),
            ColumnBuilder::Int64(v) => v.iter().map(|x| x.map(|x| x.to_string())).collect(),
            ColumnBuilder::Float64(v) => v.iter().map(|x| x.map(|x| x.to_string())).collect(),
            ColumnBuilder::Utf8(v) => v.clone(),
        }
    }

    pub(crate) fn finish(self) -> (DataType, ArrayRef) {
        match self {
            ColumnBuilder::Boolean(v) => (DataType::Boolean, Arc::new(BooleanArray::from(v))),
            ColumnBuilder::Int64(v) => (DataType::Int64, Arc::new(Int64Array::from(v))),
            ColumnBuilder::Float64(v) => (DataType::Float64, Arc::new(Float64Array::from(v))),
            ColumnBuilder::Utf8(v) => (DataType::Utf8, Arc::new(StringArray::from(v))),
        }
    }
}
