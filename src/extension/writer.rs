//! Data writing utilities for filling DuckDB vectors.

use duckdb::core::FlatVector;
use duckdb::core::Inserter;

/// One output field.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(super) enum OutputValue<'a> {
    Null,
    Varchar(&'a str),
    BigInt(i64),
    Boolean(bool),
}

impl<'a> From<Option<&'a str>> for OutputValue<'a> {
    fn from(value: Option<&'a str>) -> Self {
        value.map(OutputValue::Varchar).unwrap_or(OutputValue::Null)
    }
}

/// Writes a value at `row` of a vector whose type matches the value.
pub(super) fn write_to_vector(vector: &mut FlatVector, row: usize, value: OutputValue) {
    match value {
        OutputValue::Null => vector.set_null(row),
        OutputValue::Varchar(text) => vector.insert(row, text),
        OutputValue::BigInt(number) => write_primitive(vector, row, number),
        OutputValue::Boolean(flag) => write_primitive(vector, row, flag),
    }
}

/// Writes a primitive value directly to a vector using pointer arithmetic.
fn write_primitive<T>(vector: &mut FlatVector, index: usize, value: T) {
    unsafe {
        let pointer: *mut T = vector.as_mut_ptr();
        std::ptr::write(pointer.add(index), value);
    }
}

/// Converts a count to a BIGINT value, saturating on overflow.
pub(super) fn bigint(value: usize) -> OutputValue<'static> {
    OutputValue::BigInt(i64::try_from(value).unwrap_or(i64::MAX))
}
