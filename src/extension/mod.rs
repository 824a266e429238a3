//! # Extension Core Module
//!
//! Table function parameters, shared by every function this extension registers.
pub(crate) mod gsheet_sheets;
pub(crate) mod gsheet_tables;
pub(crate) mod read_gsheet;
pub(crate) mod read_gsheet_cells;
mod writer;

use crate::bridge::ValueBridge;
use crate::database::range::Range;
use crate::database::range::RangeExpr;
use crate::error::RustyGsheetError;
use crate::spreadsheet::reference::letters_to_column;
use crate::spreadsheet::reference::parse_cell_address;
use crate::spreadsheet::registry::SchemaRegistry;
use duckdb::core::LogicalTypeHandle;
use duckdb::core::LogicalTypeId;
use duckdb::vtab::BindInfo;
use std::sync::Arc;
use thiserror::Error;

/// Maximum number of rows written per output chunk.
pub(crate) const CHUNK_SIZE: usize = 2048;

/// Errors raised while reading table function parameters.
#[derive(Error, Debug)]
pub(crate) enum ExtensionError {
    /// Invalid parameter provided to a table function
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    /// The function was registered without its schema registry
    #[error("Schema registry is not available to '{0}'")]
    RegistryError(String),
}

impl ExtensionError {
    fn invalid(name: &str, message: String) -> Self {
        ExtensionError::InvalidParameter {
            name: name.to_owned(),
            message,
        }
    }
}

/// Returns the schema registry the entrypoint attached to a table function.
pub(crate) fn schema_registry(bind: &BindInfo, function: &str) -> Result<Arc<SchemaRegistry>, ExtensionError> {
    let registry = bind.get_extra_info::<Arc<SchemaRegistry>>();
    unsafe { registry.as_ref() }
        .cloned()
        .ok_or_else(|| ExtensionError::RegistryError(function.to_owned()))
}

/// A positional table function parameter.
pub(crate) trait Param<T> {
    /// Returns the DuckDB logical type for this parameter
    fn kind() -> LogicalTypeHandle;

    /// Extracts the parameter value at `index`
    fn read(bind: &BindInfo, index: u64) -> Result<T, RustyGsheetError>;
}

/// A named table function parameter.
pub(crate) trait NamedParam<T> {
    /// Returns the parameter name as used in SQL
    fn name() -> &'static str;

    /// Returns the DuckDB logical type for this parameter
    fn kind() -> LogicalTypeHandle;

    /// Returns the complete parameter definition (name and type)
    fn definition() -> (String, LogicalTypeHandle) {
        (Self::name().to_string(), Self::kind())
    }

    /// Extracts the parameter value, None when it was not provided
    fn read(bind: &BindInfo) -> Result<Option<T>, RustyGsheetError>;
}

fn varchar() -> LogicalTypeHandle {
    LogicalTypeHandle::from(LogicalTypeId::Varchar)
}

fn varchar_list() -> LogicalTypeHandle {
    LogicalTypeHandle::list(&varchar())
}

fn bigint() -> LogicalTypeHandle {
    LogicalTypeHandle::from(LogicalTypeId::Bigint)
}

/// Path or URL of the spreadsheet document
pub(crate) struct SpreadsheetParam;

/// Single sheet of a named-table read
pub(crate) struct SheetParam;

/// Sheet names filtering a cell read
pub(crate) struct SheetNameParam;

/// Sheet names or glob patterns selecting tables
pub(crate) struct SheetsParam;

/// A1 range, optionally sheet-qualified
pub(crate) struct RangeParam;

/// A1 cell address
pub(crate) struct CellParam;

/// 1-based row number
pub(crate) struct RowParam;

/// Column letters
pub(crate) struct ColumnParam;

/// Row budget
pub(crate) struct LimitParam;

impl Param<String> for SpreadsheetParam {
    fn kind() -> LogicalTypeHandle {
        varchar()
    }

    fn read(bind: &BindInfo, index: u64) -> Result<String, RustyGsheetError> {
        Ok(bind.get_parameter(index).to_varchar())
    }
}

impl NamedParam<String> for SheetParam {
    fn name() -> &'static str {
        "sheet"
    }

    fn kind() -> LogicalTypeHandle {
        varchar()
    }

    fn read(bind: &BindInfo) -> Result<Option<String>, RustyGsheetError> {
        Ok(bind
            .get_named_parameter(Self::name())
            .map(|value| value.to_varchar())
            .filter(|sheet| !sheet.is_empty()))
    }
}

/// Reads a VARCHAR[] parameter, dropping blank entries.
fn read_names(bind: &BindInfo, name: &str) -> Option<Vec<String>> {
    let names: Vec<String> = bind
        .get_named_parameter(name)?
        .to_list()
        .unwrap_or_default()
        .iter()
        .map(|value| value.to_varchar())
        .filter(|name| !name.trim().is_empty())
        .collect();
    Some(names)
}

impl NamedParam<Vec<String>> for SheetNameParam {
    fn name() -> &'static str {
        "sheet_name"
    }

    fn kind() -> LogicalTypeHandle {
        varchar_list()
    }

    fn read(bind: &BindInfo) -> Result<Option<Vec<String>>, RustyGsheetError> {
        Ok(read_names(bind, Self::name()))
    }
}

impl NamedParam<Vec<String>> for SheetsParam {
    fn name() -> &'static str {
        "sheets"
    }

    fn kind() -> LogicalTypeHandle {
        varchar_list()
    }

    fn read(bind: &BindInfo) -> Result<Option<Vec<String>>, RustyGsheetError> {
        Ok(read_names(bind, Self::name()))
    }
}

/// Checks a range expression. The part after '!' is checked by RangeExpr; a value without
/// a sheet must be an A1 range, never a bare sheet name.
fn validate_range(range: &str) -> Result<(), RustyGsheetError> {
    RangeExpr::try_from(range)?;
    if !range.contains('!') {
        Range::try_from(range)?;
    }
    Ok(())
}

impl NamedParam<String> for RangeParam {
    fn name() -> &'static str {
        "range"
    }

    fn kind() -> LogicalTypeHandle {
        varchar()
    }

    fn read(bind: &BindInfo) -> Result<Option<String>, RustyGsheetError> {
        let Some(range) = bind.get_named_parameter(Self::name()).map(|value| value.to_varchar()) else {
            return Ok(None);
        };
        if range.trim().is_empty() {
            return Ok(None);
        }
        validate_range(&range).map_err(|e| ExtensionError::invalid(Self::name(), e.to_string()))?;
        Ok(Some(range.trim().to_owned()))
    }
}

impl NamedParam<String> for CellParam {
    fn name() -> &'static str {
        "cell"
    }

    fn kind() -> LogicalTypeHandle {
        varchar()
    }

    fn read(bind: &BindInfo) -> Result<Option<String>, RustyGsheetError> {
        let Some(cell) = bind.get_named_parameter(Self::name()).map(|value| value.to_varchar()) else {
            return Ok(None);
        };
        if parse_cell_address(cell.trim()).is_none() {
            Err(ExtensionError::invalid(Self::name(), format!("'{}' is not a cell address", cell)))?;
        }
        Ok(Some(cell.trim().to_ascii_uppercase()))
    }
}

impl NamedParam<usize> for RowParam {
    fn name() -> &'static str {
        "row"
    }

    fn kind() -> LogicalTypeHandle {
        bigint()
    }

    fn read(bind: &BindInfo) -> Result<Option<usize>, RustyGsheetError> {
        let Some(row) = bind.get_named_parameter(Self::name()).map(|value| value.to_int64()) else {
            return Ok(None);
        };
        let row = usize::try_from(row)
            .ok()
            .filter(|row| *row > 0)
            .ok_or_else(|| ExtensionError::invalid(Self::name(), format!("row {} is not positive", row)))?;
        Ok(Some(row))
    }
}

impl NamedParam<String> for ColumnParam {
    fn name() -> &'static str {
        "column"
    }

    fn kind() -> LogicalTypeHandle {
        varchar()
    }

    fn read(bind: &BindInfo) -> Result<Option<String>, RustyGsheetError> {
        let Some(column) = bind.get_named_parameter(Self::name()).map(|value| value.to_varchar()) else {
            return Ok(None);
        };
        if letters_to_column(column.trim()).is_none() {
            Err(ExtensionError::invalid(Self::name(), format!("'{}' is not a column", column)))?;
        }
        Ok(Some(column.trim().to_ascii_uppercase()))
    }
}

impl NamedParam<usize> for LimitParam {
    fn name() -> &'static str {
        "limit"
    }

    fn kind() -> LogicalTypeHandle {
        bigint()
    }

    fn read(bind: &BindInfo) -> Result<Option<usize>, RustyGsheetError> {
        let Some(limit) = bind.get_named_parameter(Self::name()).map(|value| value.to_int64()) else {
            return Ok(None);
        };
        let limit = usize::try_from(limit)
            .map_err(|_| ExtensionError::invalid(Self::name(), format!("limit {} is negative", limit)))?;
        Ok(Some(limit))
    }
}
