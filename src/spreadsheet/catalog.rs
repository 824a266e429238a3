//! Table discovery over one spreadsheet document.
//!
//! Discovery runs in two phases: the sheet names are listed (and filtered by the configured
//! selection) first, then a schema is built for each selected sheet through the shared
//! [`SchemaRegistry`]. A sheet whose header row is missing or starts blank has no table.

use crate::database::column::ColumnSchema;
use crate::database::range::quote_sheet_name;
use crate::database::range::unquote_sheet_name;
use crate::error::RustyGsheetError;
use crate::spreadsheet::header::HeaderResolver;
use crate::spreadsheet::reference::cell_address;
use crate::spreadsheet::registry::CachedSchema;
use crate::spreadsheet::registry::SchemaRegistry;
use crate::spreadsheet::registry::TableKey;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::GridSource;
use crate::spreadsheet::SpreadsheetError;
use glob::Pattern;
use std::sync::Arc;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// Per-call connection settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ConnectionConfig {
    /// Path or URL of the spreadsheet document
    pub(crate) spreadsheet: String,
    /// Sheet names or glob patterns to expose; all sheets when empty
    pub(crate) sheets: Vec<Pattern>,
}

impl ConnectionConfig {
    pub(crate) fn new(spreadsheet: &str, sheets: Vec<String>) -> Result<Self, RustyGsheetError> {
        let spreadsheet = spreadsheet.trim();
        if spreadsheet.is_empty() {
            Err(SpreadsheetError::ConfigurationError)?;
        }
        let sheets = sheets
            .iter()
            .map(|sheet| Pattern::new(sheet))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            spreadsheet: spreadsheet.to_owned(),
            sheets,
        })
    }

    /// Checks whether a sheet is part of the configured selection, by exact name or pattern.
    fn accept(&self, sheet_name: &str) -> bool {
        self.sheets.is_empty()
            || self
                .sheets
                .iter()
                .any(|pattern| pattern.as_str() == sheet_name || pattern.matches(sheet_name))
    }
}

/// A sheet exposed as a table.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SheetTable {
    pub(crate) sheet_name: String,
    pub(crate) schema: Arc<ColumnSchema>,
}

/// Discovers the tables of one document and fetches their data.
pub(crate) struct Catalog<'a> {
    config: &'a ConnectionConfig,
    source: &'a dyn GridSource,
    registry: &'a SchemaRegistry,
}

impl<'a> Catalog<'a> {
    pub(crate) fn new(config: &'a ConnectionConfig, source: &'a dyn GridSource, registry: &'a SchemaRegistry) -> Self {
        Self { config, source, registry }
    }

    /// Phase one: the selected sheet names, in document order.
    pub(crate) fn discover_sheets(&self) -> Result<Vec<String>, RustyGsheetError> {
        let sheets: Vec<String> = self
            .source
            .list_sheet_names()?
            .iter()
            .map(|name| unquote_sheet_name(name))
            .filter(|name| self.config.accept(name))
            .collect();
        info!(spreadsheet = self.source.name(), sheets = sheets.len(), "discovered sheets");
        Ok(sheets)
    }

    /// Phase two: the schema of one sheet, computed at most once per registry. `None`
    /// means the sheet holds no table.
    pub(crate) fn build_schema(&self, sheet_name: &str) -> Result<CachedSchema, RustyGsheetError> {
        let key = TableKey::new(&self.config.spreadsheet, sheet_name);
        self.registry.get_or_compute(&key, || {
            let window = self
                .source
                .fetch_grid(&[quote_sheet_name(sheet_name)], true)?
                .into_iter()
                .next();
            Ok(window.and_then(|sheet| Self::resolve_schema(&sheet)))
        })
    }

    fn resolve_schema(sheet: &Sheet) -> Option<ColumnSchema> {
        if sheet.row_offset != 0 || sheet.col_offset != 0 {
            return None;
        }
        let header = sheet.rows.first()?;
        if !HeaderResolver::is_table_header(header) {
            return None;
        }
        let merges = sheet.merge_index();
        Some(HeaderResolver::new(&merges).resolve(header, sheet.width()))
    }

    /// Every table of the document. A sheet without a table is skipped silently; a sheet
    /// whose schema cannot be built is skipped with a warning.
    pub(crate) fn tables(&self) -> Result<Vec<SheetTable>, RustyGsheetError> {
        let mut tables = Vec::new();
        for sheet_name in self.discover_sheets()? {
            match self.build_schema(&sheet_name) {
                Ok(Some(schema)) => tables.push(SheetTable { sheet_name, schema }),
                Ok(None) => debug!(sheet = sheet_name.as_str(), "sheet has no table"),
                Err(error) => warn!(sheet = sheet_name.as_str(), %error, "skipping sheet"),
            }
        }
        info!(spreadsheet = self.source.name(), tables = tables.len(), "discovered tables");
        Ok(tables)
    }

    /// Fetches windows for `ranges` and attaches merge anchors that fall outside them, so
    /// every follower in a window can be resolved.
    pub(crate) fn fetch_windows(&self, ranges: &[String], include_merge_info: bool) -> Result<Vec<Sheet>, RustyGsheetError> {
        let mut windows = self.source.fetch_grid(ranges, include_merge_info)?;
        for window in windows.iter_mut() {
            let anchors = window.missing_anchors(&window.merge_index());
            if anchors.is_empty() {
                continue;
            }
            let expressions: Vec<String> = anchors
                .iter()
                .map(|(row, col)| format!("{}!{}", quote_sheet_name(&window.name), cell_address(*row, *col)))
                .collect();
            debug!(sheet = window.name.as_str(), anchors = anchors.len(), "fetching merge anchors");
            let cells = self.source.fetch_grid(&expressions, include_merge_info)?;
            for ((row, col), cell) in anchors.into_iter().zip(cells) {
                match cell.rows.first().and_then(|cells| cells.first()) {
                    Some(value) => window.attach(row, col, value.to_owned()),
                    None => warn!(sheet = window.name.as_str(), anchor = %cell_address(row, col), "merge anchor not found"),
                }
            }
        }
        Ok(windows)
    }
}
