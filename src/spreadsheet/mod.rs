pub(crate) mod catalog;
pub(crate) mod cell;
pub(crate) mod header;
pub(crate) mod json;
pub(crate) mod merge;
pub(crate) mod projector;
pub(crate) mod pushdown;
pub(crate) mod reference;
pub(crate) mod registry;
pub(crate) mod resolver;
pub(crate) mod sheet;

use crate::error::RustyGsheetError;
use crate::spreadsheet::json::JsonSpreadsheet;
use crate::spreadsheet::merge::MergeRange;
use crate::spreadsheet::sheet::Sheet;
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur while locating or reading a spreadsheet.
#[derive(Error, Debug)]
pub(crate) enum SpreadsheetError {
    #[error("Spreadsheet location must be configured")]
    ConfigurationError,

    #[error("Failed to fetch '{0}': {1}")]
    SourceFetchError(String, String),

    #[error("Spreadsheet '{0}' contains no sheets")]
    SpreadsheetEmptyError(String),

    #[error("Sheet '{1}' of '{0}' has no header row")]
    NoTableError(String, String),
}

/// Row and column counts of a sheet's grid.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct GridProperties {
    pub(crate) row_count: i64,
    pub(crate) column_count: i64,
}

/// Descriptive properties of one sheet.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct SheetProperties {
    pub(crate) sheet_id: i64,
    pub(crate) title: String,
    pub(crate) index: i64,
    /// "GRID", "OBJECT" or "DATA_SOURCE"
    pub(crate) sheet_type: String,
    pub(crate) hidden: bool,
    pub(crate) right_to_left: bool,
    /// Tab color as reported by the source, kept as raw JSON
    pub(crate) tab_color: Option<serde_json::Value>,
    pub(crate) grid_properties: GridProperties,
    /// Merged regions of the sheet; not part of the properties resource itself
    #[serde(skip)]
    pub(crate) merges: Vec<MergeRange>,
}

/// A source of spreadsheet grids: lists the sheets of one document and fetches windows of
/// cells addressed by A1 range expressions.
pub(crate) trait GridSource: Send + Sync {
    /// Location of the document (path or URL)
    fn name(&self) -> &str;

    /// Identifier the document reports for itself, its location when it has none.
    fn spreadsheet_id(&self) -> &str {
        self.name()
    }

    /// Properties of every sheet, with its merged regions, in document order.
    fn list_sheets(&self) -> Result<Vec<SheetProperties>, RustyGsheetError>;

    /// Sheet titles, in document order.
    fn list_sheet_names(&self) -> Result<Vec<String>, RustyGsheetError> {
        Ok(self
            .list_sheets()?
            .into_iter()
            .map(|properties| properties.title)
            .collect())
    }

    /// Fetches one window per range expression. With `include_merge_info` the windows carry
    /// the sheet's merged regions and each cell's formula, note and hyperlink; otherwise
    /// only formatted values.
    fn fetch_grid(&self, ranges: &[String], include_merge_info: bool) -> Result<Vec<Sheet>, RustyGsheetError>;
}

/// Opens the spreadsheet document at a local path or remote URL.
pub(crate) fn open_spreadsheet(location: &str) -> Result<Box<dyn GridSource>, RustyGsheetError> {
    if location.trim().is_empty() {
        Err(SpreadsheetError::ConfigurationError)?;
    }
    Ok(Box::new(JsonSpreadsheet::open(location)?))
}
