//! # DuckDB Google Sheets Extension
//!
//! A DuckDB extension exposing the sheets of a spreadsheet document as SQL tables. Documents
//! are read in the Google Sheets API v4 JSON layout, from a local path or a remote URL.
//!
//! ## Features
//!
//! - **Header-driven schemas**: the first row of a sheet names its columns; blank headers
//!   fall back to column letters and duplicates are made unique
//! - **Merged cells**: every cell of a merged region reports the value of its top-left anchor
//! - **Pushdown**: sheet, range, cell, row and column predicates narrow the fetched windows
//! - **Row budgets**: `limit` stops a scan without fetching further windows
//! - **Schema caching**: each sheet's schema is computed at most once per loaded extension
//!
//! ## Table Functions
//!
//! - `read_gsheet`: Read one sheet as a table
//! - `read_gsheet_cells`: List individual cells with address, formula, note and hyperlink
//! - `gsheet_tables`: List the sheets that hold a table, with their columns
//! - `gsheet_sheets`: List every sheet with its grid properties
extern crate duckdb;
extern crate duckdb_loadable_macros;
extern crate libduckdb_sys;

mod bridge;
mod database;
mod error;
mod extension;
mod helpers;
mod spreadsheet;

use crate::extension::gsheet_sheets::GsheetSheetsTableFunction;
use crate::extension::gsheet_tables::GsheetTablesTableFunction;
use crate::extension::read_gsheet::ReadGsheetTableFunction;
use crate::extension::read_gsheet_cells::ReadGsheetCellsTableFunction;
use crate::spreadsheet::registry::SchemaRegistry;
use anyhow::{Context, Result};
use duckdb::Connection;
use duckdb_loadable_macros::duckdb_entrypoint_c_api;
use std::sync::Arc;

/// Extension entry point for DuckDB.
///
/// Registers the four table functions. They share one schema registry, so a sheet's
/// header row is resolved once however many functions read it.
///
/// # Errors
///
/// Returns an error if any table function fails to register with DuckDB.
#[duckdb_entrypoint_c_api()]
pub unsafe fn extension_entrypoint(connection: Connection) -> Result<()> {
    let registry = Arc::new(SchemaRegistry::new());
    connection
        .register_table_function_with_extra_info::<ReadGsheetTableFunction, _>("read_gsheet", &registry)
        .context("Failed to register read_gsheet table function")?;
    connection
        .register_table_function_with_extra_info::<ReadGsheetCellsTableFunction, _>("read_gsheet_cells", &registry)
        .context("Failed to register read_gsheet_cells table function")?;
    connection
        .register_table_function_with_extra_info::<GsheetTablesTableFunction, _>("gsheet_tables", &registry)
        .context("Failed to register gsheet_tables table function")?;
    connection
        .register_table_function::<GsheetSheetsTableFunction>("gsheet_sheets")
        .context("Failed to register gsheet_sheets table function")?;
    Ok(())
}
