//! Spreadsheet documents stored as the JSON `Spreadsheet` resource of the Google Sheets
//! API v4, as returned by `spreadsheets.get` with grid data included.

use crate::database::range::Range;
use crate::database::range::RangeExpr;
use crate::error::RustyGsheetError;
use crate::helpers::reader::UnifiedReader;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::merge::MergeRange;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::GridSource;
use crate::spreadsheet::SheetProperties;
use crate::spreadsheet::SpreadsheetError;
use serde::Deserialize;
use std::io::Read;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Document {
    spreadsheet_id: String,
    sheets: Vec<DocumentSheet>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DocumentSheet {
    properties: SheetProperties,
    data: Vec<GridData>,
    merges: Vec<MergeRange>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GridData {
    start_row: usize,
    start_column: usize,
    row_data: Vec<RowData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RowData {
    values: Vec<CellValue>,
}

/// One sheet with its grid data laid out at absolute 0-based positions.
struct LoadedSheet {
    properties: SheetProperties,
    rows: Vec<Vec<CellValue>>,
    merges: Vec<MergeRange>,
}

impl From<DocumentSheet> for LoadedSheet {
    fn from(sheet: DocumentSheet) -> Self {
        let mut rows: Vec<Vec<CellValue>> = Vec::new();
        for grid in sheet.data {
            for (row_index, row_data) in grid.row_data.into_iter().enumerate() {
                let row = grid.start_row + row_index;
                if rows.len() <= row {
                    rows.resize_with(row + 1, Vec::new);
                }
                for (col_index, cell) in row_data.values.into_iter().enumerate() {
                    let col = grid.start_column + col_index;
                    let cells = &mut rows[row];
                    if cells.len() <= col {
                        cells.resize_with(col + 1, CellValue::default);
                    }
                    cells[col] = cell;
                }
            }
        }
        LoadedSheet {
            properties: SheetProperties {
                merges: sheet.merges.to_owned(),
                ..sheet.properties
            },
            rows,
            merges: sheet.merges,
        }
    }
}

impl LoadedSheet {
    /// Cuts the window selected by `range` (the whole sheet when None).
    fn window(&self, range: Option<&Range>, include_merge_info: bool) -> Sheet {
        let range = range.copied().unwrap_or_default();
        let row_lower = range.row_lower_bound.unwrap_or(0);
        let col_lower = range.col_lower_bound.unwrap_or(0);
        let row_upper = range
            .row_upper_bound
            .map(|bound| bound + 1)
            .unwrap_or(usize::MAX)
            .min(self.rows.len());
        let col_upper = range.col_upper_bound.map(|bound| bound + 1).unwrap_or(usize::MAX);
        let rows = (row_lower..row_upper.max(row_lower))
            .map(|row| {
                let cells = &self.rows[row];
                let upper = col_upper.min(cells.len()).max(col_lower.min(cells.len()));
                cells[col_lower.min(cells.len())..upper]
                    .iter()
                    .map(|cell| Self::strip(cell, include_merge_info))
                    .collect()
            })
            .collect();
        let merges = if include_merge_info {
            self.merges.to_owned()
        } else {
            Vec::new()
        };
        Sheet::new(&self.properties.title, row_lower, col_lower, rows, merges)
    }

    fn strip(cell: &CellValue, include_merge_info: bool) -> CellValue {
        if include_merge_info {
            cell.to_owned()
        } else {
            CellValue {
                formatted_value: cell.formatted_value.to_owned(),
                ..CellValue::default()
            }
        }
    }
}

/// A spreadsheet document loaded in full from a local file or a remote URL.
pub(crate) struct JsonSpreadsheet {
    name: String,
    id: String,
    sheets: Vec<LoadedSheet>,
}

impl JsonSpreadsheet {
    pub(crate) fn open(location: &str) -> Result<Self, RustyGsheetError> {
        let fetch_error = |message: String| SpreadsheetError::SourceFetchError(location.to_owned(), message);
        let mut reader = UnifiedReader::new(location).map_err(|e| fetch_error(e.to_string()))?;
        let mut content = String::new();
        reader
            .read_to_string(&mut content)
            .map_err(|e| fetch_error(e.to_string()))?;
        let spreadsheet = Self::parse(location, &content)?;
        debug!(location, sheets = spreadsheet.sheets.len(), "loaded spreadsheet");
        Ok(spreadsheet)
    }

    /// Decodes a document from its JSON text.
    pub(crate) fn parse(location: &str, content: &str) -> Result<Self, RustyGsheetError> {
        let document: Document = serde_json::from_str(content)
            .map_err(|e| SpreadsheetError::SourceFetchError(location.to_owned(), e.to_string()))?;
        Ok(JsonSpreadsheet {
            name: location.to_owned(),
            id: document.spreadsheet_id,
            sheets: document.sheets.into_iter().map(LoadedSheet::from).collect(),
        })
    }

    fn find(&self, title: &str) -> Option<&LoadedSheet> {
        self.sheets.iter().find(|sheet| sheet.properties.title == title)
    }

    /// Evaluates one range expression. An unquoted expression without '!' that names no
    /// sheet is read as a range of the first sheet; a quoted name must be a sheet.
    fn evaluate(&self, expression: &str, include_merge_info: bool) -> Result<Sheet, RustyGsheetError> {
        let not_found = || SpreadsheetError::SourceFetchError(self.name.to_owned(), format!("Unable to parse range: {}", expression));
        let expr = RangeExpr::try_from(expression).map_err(|_| not_found())?;
        let title = expr.sheet.as_deref().unwrap_or_default();
        if let Some(sheet) = self.find(title) {
            return Ok(sheet.window(expr.range.as_ref(), include_merge_info));
        }
        let bare = !expression.contains('!') && !expression.trim_start().starts_with('\'');
        if bare {
            if let (Some(sheet), Ok(range)) = (self.sheets.first(), Range::try_from(expression)) {
                return Ok(sheet.window(Some(&range), include_merge_info));
            }
        }
        Err(not_found())?
    }
}

impl GridSource for JsonSpreadsheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn spreadsheet_id(&self) -> &str {
        if self.id.is_empty() {
            &self.name
        } else {
            &self.id
        }
    }

    fn list_sheets(&self) -> Result<Vec<SheetProperties>, RustyGsheetError> {
        Ok(self
            .sheets
            .iter()
            .map(|sheet| sheet.properties.to_owned())
            .collect())
    }

    fn fetch_grid(&self, ranges: &[String], include_merge_info: bool) -> Result<Vec<Sheet>, RustyGsheetError> {
        debug!(location = self.name.as_str(), ?ranges, include_merge_info, "fetching grid");
        ranges
            .iter()
            .map(|range| self.evaluate(range, include_merge_info))
            .collect()
    }
}
